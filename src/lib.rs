//! # xbind
//!
//! Declarative data binding for markup elements. An element carries a few
//! reserved attributes (a GET url, a POST url, a cache key, a poll interval,
//! a disabled policy, an indicator key, an invalidation target) and a bound
//! element turns it into a live view over a shared keyed request cache.
//!
//! ## Features
//!
//! - **Read-queries**: `x-get` content is fetched once per cache key and
//!   injected as inner markup, optionally refreshed every `x-interval`.
//! - **Mutations**: `x-post` fires on click or form submit, then invalidates
//!   `x-invalidate` once it succeeds.
//! - **Loading state**: `x-disabled` and `x-indicate` follow the busy state
//!   of any key, shared by every element that declares it.
//! - **Pluggable hosts**: rendering goes through [`ElementFactory`], the
//!   cache through [`QueryEngine`](xbind_query::QueryEngine) and the network
//!   through [`Transport`](xbind_config::Transport).
//!
//! ## Modules
//!
//! - `attrs`: the attribute contract, reserved names and their parsing.
//! - `enhancer`: one render of a bound element.
//! - `registry`: memoized bound elements by name.
//! - `factory` / `node`: rendering targets.
//! - `tags`: the table of known element names.
//!
//! ```ignore
//! use xbind::prelude::*;
//!
//! let config = toml::from_str("[http]\ntimeout = 10")?;
//! let ctx = BindContext::from_config(&config)?;
//! let x = Registry::new(VirtualDom);
//!
//! let scope = ctx.scope();
//! let node = x.tag(Tag::Div).render(
//!     &scope,
//!     Props::new()
//!         .attr("x-get", "https://example.com/fragment")
//!         .attr("x-id", r#"["fragment"]"#)
//!         .child("loading..."),
//! );
//! ```
pub mod attrs;
pub mod context;
pub mod enhancer;
mod error;
pub mod factory;
mod logging;
pub mod node;
pub mod prelude;
pub mod registry;
pub mod tags;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use attrs::{AttrError, Binding, Props};
pub use context::{BindContext, Scope};
pub use enhancer::{is_busy, Enhanced};
pub use error::Error;
pub use factory::{ElementFactory, HtmlString, VirtualDom};
pub use logging::{init_tracing, init_tracing_from_config, init_tracing_with};
pub use node::Node;
pub use registry::Registry;
pub use tags::{ElementKind, Tag};

// re-export
pub use async_trait;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use toml;
pub use tracing;
pub use tracing_subscriber;
pub use xbind_config as config;
#[cfg(feature = "http")]
pub use xbind_config::http;
pub use xbind_query as query;
