//! Assignment cache.
//!
//! Reads are always answered synchronously from memory, then persistent
//! storage, then the built-in placeholder rows. A miss starts one background
//! reconciliation per partition; its result replaces memory and storage
//! wholesale. Writes land in memory and storage before `save` returns, and
//! are pushed to the Orders API in the background on a best-effort basis.
//!
//! Nothing here surfaces errors to `load`/`save` callers. Failed reads keep
//! the local rows, failed pushes leave local rows authoritative until the
//! next successful reconciliation overwrites them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use dispatch_api::OrdersApi;
use dispatch_api::model::{Order, OrderAssignment};
use dispatch_core::config::Settings;
use dispatch_core::constants::DEFAULT_STORE_NAMESPACE;
use dispatch_core::types::{DateKey, OrderId, partition_label};
use dispatch_store::{KeyValueStore, storage_key};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, try_join_all};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinSet;

use crate::adapter::{self, OrderIndex, Target};
use crate::assignment::{Assignment, placeholder_assignments};
use crate::error::{ServiceError, ServiceResult};
use crate::subscription::{Subscribers, Subscription};

type PartitionKey = Option<DateKey>;
type RefreshFuture = Shared<BoxFuture<'static, ()>>;

#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Storage keys are `"<namespace>:<partition>"`.
    pub namespace: String,
    /// Drop a refresh result when a local `save` on the same partition
    /// happened after the refresh started. Off by default: the last network
    /// response wins.
    pub discard_stale_refresh: bool,
    /// Rows served when storage has nothing for a partition.
    pub placeholder: Vec<Assignment>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_STORE_NAMESPACE.to_string(),
            discard_stale_refresh: false,
            placeholder: placeholder_assignments(),
        }
    }
}

impl CacheOptions {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            namespace: settings.store.namespace.clone(),
            discard_stale_refresh: settings.cache.discard_stale_refresh,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Partition {
    items: Vec<Assignment>,
    index: OrderIndex,
}

#[derive(Default)]
struct CacheState {
    partitions: HashMap<PartitionKey, Partition>,
    in_flight: HashMap<PartitionKey, RefreshFuture>,
    write_epochs: HashMap<PartitionKey, u64>,
}

impl CacheState {
    fn epoch(&self, key: PartitionKey) -> u64 {
        self.write_epochs.get(&key).copied().unwrap_or(0)
    }

    fn bump_epoch(&mut self, key: PartitionKey) {
        *self.write_epochs.entry(key).or_insert(0) += 1;
    }
}

#[derive(Debug, Default)]
struct PropagationReport {
    pushed: usize,
    skipped: usize,
    failed: usize,
}

struct Inner {
    api: Arc<dyn OrdersApi>,
    store: Arc<dyn KeyValueStore>,
    options: CacheOptions,
    runtime: Handle,
    state: Mutex<CacheState>,
    subscribers: Subscribers,
    background: Mutex<JoinSet<()>>,
}

/// Cache of "who works where, at what rate" per date partition.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AssignmentCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AssignmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentCache")
            .field("options", &self.inner.options)
            .field("subscribers", &self.inner.subscribers)
            .finish_non_exhaustive()
    }
}

impl AssignmentCache {
    /// ## Summary
    /// Creates a cache that runs background work on the current tokio runtime.
    ///
    /// ## Errors
    /// Returns `NoRuntime` when called outside a tokio runtime.
    pub fn new(
        api: Arc<dyn OrdersApi>,
        store: Arc<dyn KeyValueStore>,
        options: CacheOptions,
    ) -> ServiceResult<Self> {
        let runtime = Handle::try_current().map_err(|e| ServiceError::NoRuntime(e.to_string()))?;
        Ok(Self::with_runtime(api, store, options, runtime))
    }

    #[must_use]
    pub fn with_runtime(
        api: Arc<dyn OrdersApi>,
        store: Arc<dyn KeyValueStore>,
        options: CacheOptions,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                options,
                runtime,
                state: Mutex::new(CacheState::default()),
                subscribers: Subscribers::new(),
                background: Mutex::new(JoinSet::new()),
            }),
        }
    }

    #[must_use]
    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// ## Summary
    /// Rows for a partition (`None` is the undated aggregate view).
    ///
    /// Never waits on the network. On a memory miss, returns the persisted rows
    /// (or the placeholder rows) and starts a background reconciliation unless
    /// one is already running for the partition.
    #[tracing::instrument(level = "debug", skip_all, fields(partition = %partition_label(date)))]
    pub fn load(&self, date: Option<&DateKey>) -> Vec<Assignment> {
        let key = date.copied();
        if let Some(partition) = self.inner.state.lock().partitions.get(&key) {
            tracing::debug!(rows = partition.items.len(), "Cache hit");
            return partition.items.clone();
        }

        let snapshot = self
            .inner
            .read_persisted(date)
            .unwrap_or_else(|| self.inner.options.placeholder.clone());
        tracing::debug!(rows = snapshot.len(), "Cache miss, serving local rows");

        drop(self.ensure_refresh(key));
        snapshot
    }

    /// ## Summary
    /// Replaces the rows of a partition.
    ///
    /// Memory and storage are overwritten and subscribers notified before this
    /// returns. Pushing the change to the Orders API happens afterwards in the
    /// background; its failures are logged and never roll back the local write.
    #[tracing::instrument(level = "debug", skip_all, fields(partition = %partition_label(date), rows = items.len()))]
    pub fn save(&self, items: Vec<Assignment>, date: Option<&DateKey>) {
        let key = date.copied();
        let (previous, index) = {
            let mut state = self.inner.state.lock();
            state.bump_epoch(key);
            let (previous, index) = match state.partitions.remove(&key) {
                Some(old) => (old.items, old.index),
                None => (
                    self.inner.read_persisted(date).unwrap_or_default(),
                    OrderIndex::default(),
                ),
            };
            self.inner.persist(date, &items);
            state.partitions.insert(
                key,
                Partition {
                    items: items.clone(),
                    index: index.clone(),
                },
            );
            (previous, index)
        };

        self.inner.subscribers.notify();

        let Some(date) = key else {
            tracing::warn!("Aggregate view saved locally only, no date to propagate to");
            return;
        };
        let inner = Arc::clone(&self.inner);
        self.inner.spawn(async move {
            inner.propagate(date, items, previous, index).await;
        });
    }

    /// Registers a listener called after every local write and every applied
    /// background refresh, for any partition.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.inner.subscribers.subscribe(listener)
    }

    /// Waits for the partition's in-flight reconciliation, starting one if
    /// none is running.
    pub async fn refresh(&self, date: Option<&DateKey>) {
        self.ensure_refresh(date.copied()).await;
    }

    /// ## Summary
    /// Reconciles a partition now and returns the fresh rows.
    ///
    /// Unlike background refreshes this reports failures, and its result is
    /// always applied.
    ///
    /// ## Errors
    /// Returns the Orders API error if listing orders or their assignments fails.
    #[tracing::instrument(skip_all, fields(partition = %partition_label(date)))]
    pub async fn refresh_now(&self, date: Option<&DateKey>) -> ServiceResult<Vec<Assignment>> {
        let partition = self.inner.fetch_partition(date).await?;
        let items = partition.items.clone();
        {
            let mut state = self.inner.state.lock();
            self.inner.install(&mut state, date.copied(), partition);
        }
        self.inner.subscribers.notify();
        Ok(items)
    }

    /// Forgets the in-memory rows of a partition so the next `load`
    /// reconciles again. Persisted rows are kept as the interim answer.
    pub fn invalidate(&self, date: Option<&DateKey>) {
        if self.inner.state.lock().partitions.remove(&date.copied()).is_some() {
            tracing::debug!(partition = %partition_label(date), "Partition invalidated");
        }
    }

    /// Waits until every background refresh and push has finished.
    ///
    /// Tasks started while flushing are awaited too. Cancelling the returned
    /// future aborts the tasks it was waiting on.
    pub async fn flush(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.inner.background.lock());
            if pending.is_empty() {
                break;
            }
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "Background task did not complete");
                }
            }
        }
    }

    fn ensure_refresh(&self, key: PartitionKey) -> RefreshFuture {
        let mut state = self.inner.state.lock();
        if let Some(existing) = state.in_flight.get(&key) {
            tracing::debug!("Joining in-flight refresh");
            return existing.clone();
        }

        let started_epoch = state.epoch(key);
        let inner = Arc::clone(&self.inner);
        let refresh = async move { inner.run_refresh(key, started_epoch).await }
            .boxed()
            .shared();
        state.in_flight.insert(key, refresh.clone());
        drop(state);

        self.inner.spawn(refresh.clone());
        refresh
    }
}

impl Inner {
    fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        let mut background = self.background.lock();
        while let Some(finished) = background.try_join_next() {
            if let Err(e) = finished {
                tracing::warn!(error = %e, "Background task did not complete");
            }
        }
        background.spawn_on(task, &self.runtime);
    }

    fn read_persisted(&self, date: Option<&DateKey>) -> Option<Vec<Assignment>> {
        let key = storage_key(&self.options.namespace, date);
        match self.store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(items) => Some(items),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Ignoring unreadable persisted rows");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Persistent store unavailable for read");
                None
            }
        }
    }

    fn persist(&self, date: Option<&DateKey>, items: &[Assignment]) {
        let key = storage_key(&self.options.namespace, date);
        let result = serde_json::to_string(items)
            .map_err(ServiceError::from)
            .and_then(|raw| self.store.set(&key, &raw).map_err(ServiceError::from));
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Failed to persist rows, memory copy stays current");
        }
    }

    fn install(&self, state: &mut CacheState, key: PartitionKey, partition: Partition) {
        self.persist(key.as_ref(), &partition.items);
        tracing::info!(
            partition = %partition_label(key.as_ref()),
            rows = partition.items.len(),
            "Partition reconciled"
        );
        state.partitions.insert(key, partition);
    }

    async fn run_refresh(&self, key: PartitionKey, started_epoch: u64) {
        let result = self.fetch_partition(key.as_ref()).await;

        let applied = {
            let mut state = self.state.lock();
            state.in_flight.remove(&key);
            match result {
                Ok(_) if self.options.discard_stale_refresh && state.epoch(key) != started_epoch => {
                    tracing::debug!(
                        partition = %partition_label(key.as_ref()),
                        "Discarding refresh that started before a local write"
                    );
                    false
                }
                Ok(partition) => {
                    self.install(&mut state, key, partition);
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        partition = %partition_label(key.as_ref()),
                        error = %e,
                        "Background refresh failed, keeping local rows"
                    );
                    false
                }
            }
        };

        if applied {
            self.subscribers.notify();
        }
    }

    async fn fetch_partition(&self, date: Option<&DateKey>) -> ServiceResult<Partition> {
        let orders = self.api.list_orders(date).await?;
        let lists = try_join_all(orders.iter().map(|order| self.order_assignments(order))).await?;
        let (items, index) = adapter::assignments_from_orders(
            orders.iter().zip(lists.iter().map(Vec::as_slice)),
        );
        Ok(Partition { items, index })
    }

    async fn order_assignments(&self, order: &Order) -> ServiceResult<Vec<OrderAssignment>> {
        match &order.assignments {
            Some(inline) => Ok(inline.clone()),
            None => Ok(self.api.get_assignments(&order.id).await?),
        }
    }

    async fn propagate(
        &self,
        date: DateKey,
        items: Vec<Assignment>,
        previous: Vec<Assignment>,
        index: OrderIndex,
    ) {
        match self.try_propagate(date, &items, &previous, &index).await {
            Ok(report) => tracing::info!(
                date = %date,
                pushed = report.pushed,
                skipped = report.skipped,
                failed = report.failed,
                "Propagation finished"
            ),
            Err(e) => tracing::warn!(
                date = %date,
                error = %e,
                "Propagation failed, local rows stay authoritative"
            ),
        }
    }

    async fn try_propagate(
        &self,
        date: DateKey,
        items: &[Assignment],
        previous: &[Assignment],
        index: &OrderIndex,
    ) -> ServiceResult<PropagationReport> {
        let previous_groups = adapter::group_by_shop(previous);
        let mut groups = adapter::group_by_shop(items);
        // Shops whose rows were all removed still need an empty replace.
        for shop_id in previous_groups.keys() {
            groups.entry(shop_id.clone()).or_default();
        }
        let mut report = PropagationReport::default();
        if groups.is_empty() {
            return Ok(report);
        }

        let orders = self.api.list_orders(Some(&date)).await?;
        let orders_by_shop = adapter::open_orders_by_shop(&orders);

        for (shop_id, rows) in &groups {
            if let Some(e) = rows.iter().find_map(|row| row.validate().err()) {
                tracing::warn!(shop_id = %shop_id, error = %e, "Skipping shop with invalid rows");
                report.skipped += 1;
                continue;
            }

            let basis = if rows.is_empty() {
                previous_groups.get(shop_id).map_or(&[][..], Vec::as_slice)
            } else {
                rows.as_slice()
            };
            let shop_orders = orders_by_shop.get(shop_id).map_or(&[][..], Vec::as_slice);

            match adapter::resolve_target(basis, shop_orders, index) {
                Target::Order(order_id) => {
                    let inputs = adapter::assignment_inputs(rows);
                    match self.api.replace_assignments(&order_id, &inputs).await {
                        Ok(_) => {
                            tracing::debug!(
                                shop_id = %shop_id,
                                order_id = %order_id,
                                rows = rows.len(),
                                "Shop rows pushed"
                            );
                            self.remember_targets(date, rows, &order_id);
                            report.pushed += 1;
                        }
                        Err(e) => {
                            tracing::warn!(
                                shop_id = %shop_id,
                                order_id = %order_id,
                                error = %e,
                                "Failed to push shop rows"
                            );
                            report.failed += 1;
                        }
                    }
                }
                Target::NoOrder => {
                    tracing::warn!(shop_id = %shop_id, "No open order for shop, rows stay local");
                    report.skipped += 1;
                }
                Target::Ambiguous { candidates } => {
                    tracing::warn!(
                        shop_id = %shop_id,
                        candidates,
                        "Rows do not single out one of the shop's orders, rows stay local"
                    );
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    fn remember_targets(&self, date: DateKey, rows: &[&Assignment], order_id: &OrderId) {
        let mut state = self.state.lock();
        if let Some(partition) = state.partitions.get_mut(&Some(date)) {
            for row in rows {
                partition.index.record(row.id.clone(), order_id.clone());
            }
        }
    }
}
