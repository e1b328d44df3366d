//! In-memory implementation of the [`QueryEngine`] contract.
//!
//! Entries live in process memory and disappear with the client. Fetches,
//! mutations and pollers run as tokio tasks on the runtime that registered
//! them; every state change bumps a revision counter that hosts can watch to
//! schedule a re-render.
use crate::engine::{
    InstanceId, MutationFn, MutationHandle, MutationState, QueryEngine, QueryFn,
    QueryOptions, QueryResult, QueryState, QueryStatus,
};
use crate::{FormData, QueryKey};
use futures::future::BoxFuture;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};
use tokio::{
    runtime::Handle,
    sync::watch,
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, instrument, trace, warn};

struct QueryEntry {
    fetcher: Option<QueryFn>,
    options: QueryOptions,
    state: QueryState,
    poller: Option<JoinHandle<()>>,
    // invalidated while a fetch was running
    refetch_after: bool,
}

impl QueryEntry {
    fn new() -> Self {
        Self {
            fetcher: None,
            options: QueryOptions {
                enabled: false,
                ..QueryOptions::default()
            },
            state: QueryState::default(),
            poller: None,
            refetch_after: false,
        }
    }
}

#[derive(Default)]
struct MutationEntry {
    channel: Option<QueryKey>,
    in_flight: usize,
    state: MutationState,
}

struct Inner {
    queries: Mutex<HashMap<QueryKey, QueryEntry>>,
    mutations: Mutex<HashMap<InstanceId, MutationEntry>>,
    revision: watch::Sender<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    fn refetch(self: &Arc<Self>, key: &QueryKey) {
        let started = {
            let mut queries = lock(&self.queries);
            match queries.get_mut(key) {
                Some(entry) => start_fetch(self, key, entry),
                None => false,
            }
        };
        if started {
            self.bump();
        }
    }

    fn finish_fetch(&self, key: &QueryKey, result: QueryResult) {
        {
            let mut queries = lock(&self.queries);
            let Some(entry) = queries.get_mut(key) else {
                trace!(%key, "entry cleared before fetch settled");
                return;
            };
            entry.state.is_fetching = false;
            match result {
                Ok(data) => {
                    entry.state.data = data;
                    entry.state.error = None;
                    entry.state.updated_at = Some(Instant::now());
                    entry.state.status = if entry.refetch_after {
                        QueryStatus::Stale
                    } else {
                        QueryStatus::Fresh
                    };
                }
                Err(err) => {
                    warn!(%key, error = %err, "read-query failed");
                    entry.state.error = Some(err.to_string());
                    entry.state.status = QueryStatus::Error;
                }
            }
            entry.refetch_after = false;
        }
        self.bump();
    }

    fn begin_mutation(self: &Arc<Self>, instance: InstanceId) -> InFlight {
        {
            let mut mutations = lock(&self.mutations);
            let entry = mutations.entry(instance).or_default();
            entry.in_flight += 1;
            entry.state.is_pending = true;
            entry.state.submitted += 1;
            debug!(%instance, channel = ?entry.channel, "mutation started");
        }
        self.bump();
        InFlight {
            inner: Arc::clone(self),
            instance,
            settled: false,
        }
    }

    fn finish_mutation(&self, instance: InstanceId, result: Option<&QueryResult>) {
        {
            let mut mutations = lock(&self.mutations);
            let Some(entry) = mutations.get_mut(&instance) else {
                return;
            };
            entry.in_flight = entry.in_flight.saturating_sub(1);
            entry.state.is_pending = entry.in_flight > 0;
            match result {
                Some(Ok(data)) => {
                    entry.state.data = data.clone();
                    entry.state.error = None;
                }
                Some(Err(err)) => {
                    warn!(%instance, error = %err, "mutation failed");
                    entry.state.error = Some(err.to_string());
                }
                None => debug!(%instance, "mutation dropped before settling"),
            }
        }
        self.bump();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let queries = self
            .queries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for entry in queries.values_mut() {
            if let Some(poller) = entry.poller.take() {
                poller.abort();
            }
        }
    }
}

/// Keeps a mutation counted as in flight until it settles or is dropped.
struct InFlight {
    inner: Arc<Inner>,
    instance: InstanceId,
    settled: bool,
}

impl InFlight {
    fn settle(mut self, result: &QueryResult) {
        self.settled = true;
        self.inner.finish_mutation(self.instance, Some(result));
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.finish_mutation(self.instance, None);
        }
    }
}

/// Start a fetch for `entry` unless one is running. Caller holds the lock and
/// bumps the revision when this returns true.
fn start_fetch(inner: &Arc<Inner>, key: &QueryKey, entry: &mut QueryEntry) -> bool {
    if entry.state.is_fetching {
        return false;
    }
    let Some(fetcher) = entry.fetcher.clone() else {
        return false;
    };
    let Ok(runtime) = Handle::try_current() else {
        warn!(%key, "no tokio runtime, read-query not fetched");
        return false;
    };
    entry.state.is_fetching = true;
    entry.state.fetch_count += 1;
    runtime.spawn(run_fetch(Arc::clone(inner), key.clone(), fetcher));
    true
}

#[instrument(skip(inner, fetcher), fields(key = %key))]
async fn run_fetch(inner: Arc<Inner>, key: QueryKey, fetcher: QueryFn) {
    debug!("fetch started");
    let result = fetcher().await;
    inner.finish_fetch(&key, result);
}

fn spawn_poller(
    inner: &Arc<Inner>,
    key: &QueryKey,
    period: Duration,
) -> Option<JoinHandle<()>> {
    if period.is_zero() {
        warn!(%key, "zero refetch interval ignored");
        return None;
    }
    let runtime = Handle::try_current().ok()?;
    let weak = Arc::downgrade(inner);
    let key = key.clone();
    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            trace!(%key, "poll tick");
            inner.refetch(&key);
        }
    }))
}

/// Shared keyed cache used by bound elements.
#[derive(Clone)]
pub struct InMemoryQueryClient {
    inner: Arc<Inner>,
}

impl InMemoryQueryClient {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                queries: Mutex::new(HashMap::new()),
                mutations: Mutex::new(HashMap::new()),
                revision,
            }),
        }
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    pub fn query_state(&self, key: &QueryKey) -> Option<QueryState> {
        lock(&self.inner.queries)
            .get(key)
            .map(|entry| entry.state.clone())
    }

    pub fn mutation_state(&self, instance: InstanceId) -> Option<MutationState> {
        lock(&self.inner.mutations)
            .get(&instance)
            .map(|entry| entry.state.clone())
    }

    pub fn query_count(&self) -> usize {
        lock(&self.inner.queries).len()
    }

    /// Seed or overwrite the payload of a read-query.
    pub fn set_query_data(&self, key: &QueryKey, data: impl Into<String>) {
        {
            let mut queries = lock(&self.inner.queries);
            let entry = queries.entry(key.clone()).or_insert_with(QueryEntry::new);
            entry.state.data = Some(data.into());
            entry.state.status = QueryStatus::Fresh;
            entry.state.error = None;
            entry.state.updated_at = Some(Instant::now());
        }
        self.inner.bump();
    }

    /// Refetch every query that opted into refetching on focus regain.
    /// Returns the number of fetches started.
    pub fn focus_regained(&self) -> usize {
        let started = {
            let mut queries = lock(&self.inner.queries);
            let mut started = 0;
            for (key, entry) in queries.iter_mut() {
                if !(entry.options.enabled && entry.options.refetch_on_focus) {
                    continue;
                }
                if start_fetch(&self.inner, key, entry) {
                    started += 1;
                }
            }
            started
        };
        if started > 0 {
            self.inner.bump();
        }
        started
    }

    /// Forget the mutation state of an unmounted instance.
    pub fn remove_instance(&self, instance: InstanceId) {
        let removed = lock(&self.inner.mutations).remove(&instance).is_some();
        if removed {
            self.inner.bump();
        }
    }

    /// No read-query fetching and no mutation in flight.
    pub fn is_idle(&self) -> bool {
        let fetching = lock(&self.inner.queries)
            .values()
            .any(|entry| entry.state.is_fetching);
        let mutating = lock(&self.inner.mutations)
            .values()
            .any(|entry| entry.in_flight > 0);
        !fetching && !mutating
    }

    /// Wait until [`is_idle`](Self::is_idle) holds.
    pub async fn wait_idle(&self) {
        let mut revisions = self.subscribe();
        loop {
            if self.is_idle() {
                return;
            }
            if revisions.changed().await.is_err() {
                return;
            }
        }
    }

    /// Drop all entries and stop pollers.
    pub fn clear(&self) {
        {
            let mut queries = lock(&self.inner.queries);
            for entry in queries.values_mut() {
                if let Some(poller) = entry.poller.take() {
                    poller.abort();
                }
            }
            queries.clear();
            lock(&self.inner.mutations).clear();
        }
        self.inner.bump();
    }
}

impl Default for InMemoryQueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine for InMemoryQueryClient {
    fn register_query(
        &self,
        key: &QueryKey,
        fetcher: QueryFn,
        options: QueryOptions,
    ) -> QueryState {
        let (state, started) = {
            let mut queries = lock(&self.inner.queries);
            let entry = queries.entry(key.clone()).or_insert_with(QueryEntry::new);

            if options.enabled {
                entry.fetcher = Some(fetcher);
                let running = entry.poller.as_ref().and(entry.options.refetch_interval);
                // a running poller survives re-registration unless outpaced
                let interval = match (running, options.refetch_interval) {
                    (Some(current), Some(period)) if period < current => {
                        if let Some(poller) = entry.poller.take() {
                            poller.abort();
                        }
                        entry.poller = spawn_poller(&self.inner, key, period);
                        Some(period)
                    }
                    (Some(current), _) => Some(current),
                    (None, Some(period)) => {
                        entry.poller = spawn_poller(&self.inner, key, period);
                        Some(period)
                    }
                    (None, None) => None,
                };
                entry.options = QueryOptions {
                    refetch_interval: interval,
                    ..options.clone()
                };
            }

            let wants_data = matches!(
                entry.state.status,
                QueryStatus::Idle | QueryStatus::Stale
            );
            let started =
                options.enabled && wants_data && start_fetch(&self.inner, key, entry);
            (entry.state.clone(), started)
        };
        if started {
            self.inner.bump();
        }
        state
    }

    fn register_mutation(
        &self,
        instance: InstanceId,
        channel: Option<&QueryKey>,
        mutate: MutationFn,
    ) -> MutationHandle {
        let state = {
            let mut mutations = lock(&self.inner.mutations);
            let entry = mutations.entry(instance).or_default();
            entry.channel = channel.cloned();
            entry.state.clone()
        };

        let inner = Arc::clone(&self.inner);
        let invoker = Arc::new(move |input: Option<FormData>| {
            let in_flight = inner.begin_mutation(instance);
            let mutate = Arc::clone(&mutate);
            Box::pin(async move {
                let result = mutate(input).await;
                in_flight.settle(&result);
                result
            }) as BoxFuture<'static, QueryResult>
        });
        MutationHandle::new(state, invoker)
    }

    fn fetching_queries(&self, filter: &QueryKey) -> usize {
        lock(&self.inner.queries)
            .iter()
            .filter(|(key, entry)| entry.state.is_fetching && key.starts_with(filter))
            .count()
    }

    fn in_flight_mutations(&self, filter: &QueryKey, exact: bool) -> usize {
        lock(&self.inner.mutations)
            .values()
            .filter(|entry| {
                entry
                    .channel
                    .as_ref()
                    .is_some_and(|channel| channel.matches(filter, exact))
            })
            .map(|entry| entry.in_flight)
            .sum()
    }

    fn invalidate_queries(&self, filter: &QueryKey) {
        let marked = {
            let mut queries = lock(&self.inner.queries);
            let mut marked = 0;
            for (key, entry) in queries.iter_mut() {
                if !key.starts_with(filter) {
                    continue;
                }
                if entry.state.is_fetching {
                    entry.refetch_after = true;
                }
                entry.state.status = QueryStatus::Stale;
                marked += 1;
            }
            marked
        };
        debug!(%filter, marked, "queries invalidated");
        self.inner.bump();
    }
}

impl std::fmt::Debug for InMemoryQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queries = lock(&self.inner.queries);
        let mutations = lock(&self.inner.mutations);

        f.debug_struct("InMemoryQueryClient")
            .field("queries", &queries.len())
            .field("mutations", &mutations.len())
            .field("revision", &*self.inner.revision.borrow())
            .finish()
    }
}
