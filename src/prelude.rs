pub use crate::attrs::{
    AttrValue, Attributes, Binding, Confirm, DisabledPolicy, Invalidate, NativeProps,
    Props, ReservedAttr, ResponseKind,
};
pub use crate::context::{BindContext, Scope};
pub use crate::enhancer::Enhanced;
pub use crate::factory::{ElementFactory, HtmlString, VirtualDom};
pub use crate::node::{handler, Event, EventHandler, Node, NodeRef};
pub use crate::registry::Registry;
pub use crate::tags::{ElementKind, Tag};
pub use xbind_query::{key, FormData, InMemoryQueryClient, InstanceId, QueryEngine, QueryKey};
