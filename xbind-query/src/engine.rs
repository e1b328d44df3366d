//! The cache/query engine contract consumed by bound elements.
//!
//! Every method is called once per render, so implementations must be
//! idempotent and cheap when nothing changed.
use futures::future::BoxFuture;
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::{FormData, QueryError, QueryKey};

pub type QueryResult = Result<Option<String>, QueryError>;

/// Produces the payload for a read-query. `Ok(None)` means "no source".
pub type QueryFn = Arc<dyn Fn() -> BoxFuture<'static, QueryResult> + Send + Sync>;

/// Performs a mutation with optional form fields.
pub type MutationFn =
    Arc<dyn Fn(Option<FormData>) -> BoxFuture<'static, QueryResult> + Send + Sync>;

pub type AbstractQueryEngine = Arc<dyn QueryEngine>;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Host-assigned identity of one mounted element. Mutation state is kept
/// per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for InstanceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Disabled registrations create the entry but never fetch, and never
    /// replace the fetcher of an enabled registration.
    pub enabled: bool,
    pub refetch_on_focus: bool,
    pub refetch_interval: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            refetch_on_focus: true,
            refetch_interval: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// Never fetched
    #[default]
    Idle,
    /// Last fetch succeeded
    Fresh,
    /// Invalidated; the next read refetches
    Stale,
    /// Last fetch failed
    Error,
}

/// Snapshot of one read-query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub data: Option<String>,
    pub status: QueryStatus,
    pub is_fetching: bool,
    pub error: Option<String>,
    pub updated_at: Option<Instant>,
    pub fetch_count: u64,
}

impl QueryState {
    pub fn is_stale(&self) -> bool {
        self.status == QueryStatus::Stale
    }
}

/// Snapshot of one instance's mutation channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    pub is_pending: bool,
    pub data: Option<String>,
    pub error: Option<String>,
    pub submitted: u64,
}

/// Returned by [`QueryEngine::register_mutation`]: the state at registration
/// time plus a way to fire the mutation.
#[derive(Clone)]
pub struct MutationHandle {
    state: MutationState,
    invoker: MutationFn,
}

impl MutationHandle {
    pub fn new(state: MutationState, invoker: MutationFn) -> Self {
        Self { state, invoker }
    }

    /// Fire the mutation. The engine counts it as in flight from this call on,
    /// before the returned future is first polled.
    pub fn invoke(&self, input: Option<FormData>) -> BoxFuture<'static, QueryResult> {
        (self.invoker)(input)
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending
    }

    pub fn data(&self) -> Option<&str> {
        self.state.data.as_deref()
    }

    pub fn state(&self) -> &MutationState {
        &self.state
    }
}

impl fmt::Debug for MutationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHandle")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

pub trait QueryEngine: Send + Sync {
    /// Register (or refresh) a read-query and return its current state.
    fn register_query(
        &self,
        key: &QueryKey,
        fetcher: QueryFn,
        options: QueryOptions,
    ) -> QueryState;

    /// Register the mutation channel of one element instance.
    fn register_mutation(
        &self,
        instance: InstanceId,
        channel: Option<&QueryKey>,
        mutate: MutationFn,
    ) -> MutationHandle;

    /// Number of read-queries matching `filter` (prefix match) currently fetching.
    fn fetching_queries(&self, filter: &QueryKey) -> usize;

    /// Number of in-flight mutations whose channel matches `filter`.
    fn in_flight_mutations(&self, filter: &QueryKey, exact: bool) -> usize;

    /// Mark every read-query matching `filter` as stale.
    fn invalidate_queries(&self, filter: &QueryKey);
}
