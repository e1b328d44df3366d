//! Rendering targets for bound elements.
use crate::attrs::NativeProps;
use crate::node::{write_element, Node};
use crate::tags::ElementKind;

/// Host rendering engine. Bound elements compute their props and hand the
/// cleaned result here; they never build output themselves.
pub trait ElementFactory: Send + Sync + 'static {
    type Output;

    fn create_element(&self, kind: &ElementKind, props: NativeProps) -> Self::Output;

    /// The "renders nothing" result.
    fn empty(&self) -> Self::Output;
}

/// Builds [`Node`] trees that can be inspected and dispatched against.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualDom;

impl ElementFactory for VirtualDom {
    type Output = Node;

    fn create_element(&self, kind: &ElementKind, props: NativeProps) -> Node {
        Node::element(kind.clone(), props)
    }

    fn empty(&self) -> Node {
        Node::Empty
    }
}

/// Renders static HTML. Event handlers and refs are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlString;

impl ElementFactory for HtmlString {
    type Output = String;

    fn create_element(&self, kind: &ElementKind, props: NativeProps) -> String {
        let mut out = String::new();
        write_element(kind, &props, &mut out);
        out
    }

    fn empty(&self) -> String {
        String::new()
    }
}
