//! Keyed read-query and mutation cache used by `xbind` elements.
//!
//! The crate defines the engine contract ([`QueryEngine`]) that bound
//! elements consume, the structural [`QueryKey`], and an in-process backend
//! ([`InMemoryQueryClient`]).
pub mod engine;
pub mod form;
pub mod key;
pub mod memory;

pub use crate::engine::{
    AbstractQueryEngine, InstanceId, MutationFn, MutationHandle, MutationState,
    QueryEngine, QueryFn, QueryOptions, QueryResult, QueryState, QueryStatus,
};
pub use crate::form::FormData;
pub use crate::key::{KeySegment, QueryKey};
pub use crate::memory::InMemoryQueryClient;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid query key: {0}")]
    InvalidKey(String),
}
