//! Per-collection reconciliation lifecycle.
//!
//! A [`SyncedCollection`] ties a [`ReconciledView`] to its Local Store
//! Adapter and, once attached, to a Remote Feed Adapter. It moves through
//! `Uninitialized -> Loading -> Ready` and publishes a fresh [`Snapshot`]
//! after every change.
//!
//! The view sits behind a mutex that is never held across an `.await`, so
//! every mutation and every merge runs to completion before the next one
//! starts. Remote payloads for the collection are applied by a single
//! listener task in delivery order.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::feed::{decode_snapshot, FeedError, RemoteFeed, SubscriptionHandle};
use crate::reconcile::{LocalMutation, MergePolicy, MergeStats, PendingChange, ReconciledView};
use crate::record::{Collection, Record};
use crate::store::{LocalStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Loading,
    Ready,
}

/// Read-only view handed to consumers.
#[derive(Debug, Clone)]
pub struct Snapshot<R> {
    pub records: Arc<[R]>,
    pub is_loading: bool,
}

impl<R> Snapshot<R> {
    fn empty(is_loading: bool) -> Self {
        Self {
            records: Arc::from(Vec::new()),
            is_loading,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

struct Inner<R> {
    view: ReconciledView<R>,
    state: SyncState,
    /// Bumped on attach and teardown; listeners from older generations are ignored.
    generation: u64,
}

struct Shared<R> {
    inner: Mutex<Inner<R>>,
    publisher: watch::Sender<Snapshot<R>>,
    policy: MergePolicy,
}

impl<R: Record> Shared<R> {
    fn lock(&self) -> MutexGuard<'_, Inner<R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the lock and publishes the resulting snapshot.
    fn update<T>(&self, f: impl FnOnce(&mut Inner<R>) -> T) -> T {
        let mut inner = self.lock();
        let out = f(&mut inner);
        self.publisher.send_replace(Snapshot {
            records: inner.view.records().to_vec().into(),
            is_loading: inner.state != SyncState::Ready,
        });
        out
    }

    fn bump_generation(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.generation
    }

    fn apply_remote(&self, generation: u64, records: Vec<R>) -> Option<MergeStats> {
        let policy = self.policy;
        if self.lock().generation != generation {
            return None;
        }

        // Re-checked under the publishing lock; teardown may have raced us.
        self.update(|inner| {
            (inner.generation == generation).then(|| inner.view.merge_remote(records, policy))
        })
    }
}

struct Listener {
    feed: Arc<dyn RemoteFeed>,
    handle: SubscriptionHandle,
    task: JoinHandle<()>,
}

impl Listener {
    fn stop(self) {
        self.task.abort();
        self.feed.unsubscribe(self.handle);
    }
}

/// The reconciled state of one collection plus its adapters.
pub struct SyncedCollection<R: Record, S> {
    store: Arc<S>,
    shared: Arc<Shared<R>>,
    listener: Option<Listener>,
}

impl<R: Record, S: LocalStore<R>> SyncedCollection<R, S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_policy(store, MergePolicy::default())
    }

    pub fn with_policy(store: Arc<S>, policy: MergePolicy) -> Self {
        let (publisher, _) = watch::channel(Snapshot::empty(true));
        Self {
            store,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    view: ReconciledView::new(),
                    state: SyncState::Uninitialized,
                    generation: 0,
                }),
                publisher,
                policy,
            }),
            listener: None,
        }
    }

    pub fn collection(&self) -> Collection {
        R::COLLECTION
    }

    pub fn policy(&self) -> MergePolicy {
        self.shared.policy
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn state(&self) -> SyncState {
        self.shared.lock().state
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    /// Current snapshot. Cheap: records are shared, not copied.
    pub fn snapshot(&self) -> Snapshot<R> {
        self.shared.publisher.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn watch(&self) -> watch::Receiver<Snapshot<R>> {
        self.shared.publisher.subscribe()
    }

    pub fn get(&self, id: &str) -> Option<R> {
        self.shared.lock().view.get(id).cloned()
    }

    /// Loads the full collection from the local store.
    ///
    /// A failing store leaves an empty, ready view; the failure is logged
    /// rather than returned.
    pub async fn initialize(&self) {
        self.shared.update(|inner| inner.state = SyncState::Loading);

        let fetched = self.store.get_all().await;

        self.shared.update(|inner| {
            match fetched {
                Ok(records) => {
                    tracing::info!("Loaded {} {} from local store", records.len(), R::COLLECTION);
                    inner.view = ReconciledView::from_records(records);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", R::COLLECTION, e);
                    inner.view.clear();
                }
            }
            inner.state = SyncState::Ready;
        });
    }

    /// Reloads from the local store, replacing the view.
    pub async fn refetch(&self) {
        self.initialize().await;
    }

    /// Applies a local change to the view only.
    pub fn on_local_mutation(&self, mutation: LocalMutation<R>) -> PendingChange<R> {
        self.shared.update(|inner| inner.view.apply_local(mutation))
    }

    /// Merges a remote snapshot into the view.
    pub fn on_remote_snapshot(&self, records: Vec<R>) -> MergeStats {
        let policy = self.shared.policy;
        let stats = self
            .shared
            .update(|inner| inner.view.merge_remote(records, policy));
        tracing::debug!("Merged {} snapshot: {:?}", R::COLLECTION, stats);
        stats
    }

    /// Creates a record through the local store, then puts the canonical
    /// copy at the front of the view.
    pub async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        let record = self.store.create(draft).await.map_err(|e| {
            tracing::warn!("Failed to create {} record: {}", R::COLLECTION, e);
            e
        })?;

        let _ = self.on_local_mutation(LocalMutation::Create(record.clone()));
        Ok(record)
    }

    /// Updates a record optimistically.
    ///
    /// The view changes before the store is called; if the store fails the
    /// change is reverted and the error returned.
    pub async fn update(&self, mut record: R) -> Result<R, StoreError> {
        record.touch(Utc::now());
        let pending = self.on_local_mutation(LocalMutation::Update(record.clone()));

        match self.store.update(&record).await {
            Ok(()) => Ok(record),
            Err(e) => {
                tracing::warn!("Failed to update {} {}: {}", R::COLLECTION, record.id(), e);
                self.rollback(pending);
                Err(e)
            }
        }
    }

    /// Deletes a record optimistically, restoring it if the store fails.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let pending = self.on_local_mutation(LocalMutation::Delete(id.to_string()));

        match self.store.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Failed to delete {} {}: {}", R::COLLECTION, id, e);
                self.rollback(pending);
                Err(e)
            }
        }
    }

    fn rollback(&self, pending: PendingChange<R>) {
        let id = pending.id().to_string();
        let reverted = self.shared.update(|inner| inner.view.revert(pending));
        if !reverted {
            tracing::debug!(
                "Kept remote version of {} {}; local change not reverted",
                R::COLLECTION,
                id
            );
        }
    }

    /// Subscribes to `feed` and applies its snapshots as they arrive.
    ///
    /// Replaces any previous subscription. Must be called inside a tokio
    /// runtime.
    pub fn attach(&mut self, feed: Arc<dyn RemoteFeed>) -> Result<(), FeedError> {
        if let Some(listener) = self.listener.take() {
            listener.stop();
        }

        let subscription = feed.subscribe(R::COLLECTION)?;
        let generation = self.shared.bump_generation();
        let shared = Arc::clone(&self.shared);
        let mut receiver = subscription.receiver;

        let task = tokio::spawn(async move {
            while let Some(payload) = receiver.recv().await {
                let Some(records) = decode_snapshot::<R>(&payload) else {
                    continue;
                };
                let received = records.len();
                match shared.apply_remote(generation, records) {
                    Some(stats) => tracing::debug!(
                        "Applied {} snapshot ({} records): {:?}",
                        R::COLLECTION,
                        received,
                        stats
                    ),
                    None => break,
                }
            }
            tracing::debug!("{} listener stopped", R::COLLECTION);
        });

        tracing::info!("Subscribed to remote {} ({})", R::COLLECTION, subscription.handle);
        self.listener = Some(Listener {
            feed,
            handle: subscription.handle,
            task,
        });
        Ok(())
    }

    /// Stops remote processing and resets to `Uninitialized`.
    ///
    /// In-flight local store calls are not cancelled.
    pub fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            tracing::info!("Unsubscribed from remote {} ({})", R::COLLECTION, listener.handle);
            listener.stop();
        }
        self.shared.bump_generation();
        self.shared.update(|inner| {
            inner.view.clear();
            inner.state = SyncState::Uninitialized;
        });
    }
}

impl<R: Record, S> Drop for SyncedCollection<R, S> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop();
        }
    }
}
