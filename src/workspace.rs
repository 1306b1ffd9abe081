//! The synced collections of an Arkive installation.

use arkive_core::{
    AccessAction, Activity, ActivityDraft, Client, Document, Expense, FeedError, MergePolicy,
    Notification, Receipt, RemoteFeed, StoreError, SyncedCollection,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db::SqliteRecordStore;

pub type Synced<R> = SyncedCollection<R, SqliteRecordStore<R>>;

#[derive(Debug)]
pub enum WorkspaceError {
    NotFound(String),
    Store(StoreError),
    Feed(FeedError),
}

impl std::fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceError::NotFound(what) => write!(f, "Not found: {}", what),
            WorkspaceError::Store(e) => write!(f, "{}", e),
            WorkspaceError::Feed(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for WorkspaceError {}

impl From<StoreError> for WorkspaceError {
    fn from(e: StoreError) -> Self {
        WorkspaceError::Store(e)
    }
}

impl From<FeedError> for WorkspaceError {
    fn from(e: FeedError) -> Self {
        WorkspaceError::Feed(e)
    }
}

pub struct Workspace {
    pub clients: Synced<Client>,
    pub receipts: Synced<Receipt>,
    pub expenses: Synced<Expense>,
    pub notifications: Synced<Notification>,
    pub documents: Synced<Document>,
    /// Audit trail; only ever appended to.
    pub activities: Synced<Activity>,
}

impl Workspace {
    pub fn new(pool: SqlitePool, policy: MergePolicy) -> Self {
        Self {
            clients: synced(&pool, policy),
            receipts: synced(&pool, policy),
            expenses: synced(&pool, policy),
            notifications: synced(&pool, policy),
            documents: synced(&pool, policy),
            activities: synced(&pool, policy),
        }
    }

    /// Loads every collection from the local store.
    pub async fn initialize(&self) {
        tokio::join!(
            self.clients.initialize(),
            self.receipts.initialize(),
            self.expenses.initialize(),
            self.notifications.initialize(),
            self.documents.initialize(),
            self.activities.initialize(),
        );
    }

    /// Subscribes every collection to `feed`.
    pub fn attach(&mut self, feed: Arc<dyn RemoteFeed>) -> Result<(), WorkspaceError> {
        self.clients.attach(Arc::clone(&feed))?;
        self.receipts.attach(Arc::clone(&feed))?;
        self.expenses.attach(Arc::clone(&feed))?;
        self.notifications.attach(Arc::clone(&feed))?;
        self.documents.attach(Arc::clone(&feed))?;
        self.activities.attach(feed)?;
        Ok(())
    }

    pub fn teardown(&mut self) {
        self.clients.teardown();
        self.receipts.teardown();
        self.expenses.teardown();
        self.notifications.teardown();
        self.documents.teardown();
        self.activities.teardown();
    }

    /// Receipts issued to the client with `cnic`, newest first.
    ///
    /// Reads the local store directly; on failure logs and returns nothing.
    pub async fn receipts_by_client(&self, cnic: &str) -> Vec<Receipt> {
        self.receipts
            .store()
            .list_by_field("clientCnic", cnic)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load receipts for client {}: {}", cnic, e);
                Vec::new()
            })
    }

    /// Documents uploaded for the client with `cnic`, newest first.
    pub async fn documents_by_client(&self, cnic: &str) -> Vec<Document> {
        self.documents
            .store()
            .list_by_field("clientCnic", cnic)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load documents for client {}: {}", cnic, e);
                Vec::new()
            })
    }

    /// Marks one notification as read. Failures are logged, not returned.
    ///
    /// Returns true if the notification was updated.
    pub async fn mark_notification_read(&self, id: &str) -> bool {
        let Some(notification) = self.notifications.get(id) else {
            tracing::warn!("Cannot mark unknown notification {} as read", id);
            return false;
        };

        match self.notifications.update(notification.mark_read()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to mark notification {} as read: {}", id, e);
                false
            }
        }
    }

    /// Marks every unread notification as read, stopping at the first
    /// failure. Returns how many were updated.
    pub async fn mark_all_notifications_read(&self) -> Result<usize, WorkspaceError> {
        let unread: Vec<Notification> = self
            .notifications
            .snapshot()
            .records
            .iter()
            .filter(|n| !n.read)
            .cloned()
            .collect();

        for notification in &unread {
            self.notifications.update(notification.mark_read()).await?;
        }
        Ok(unread.len())
    }

    /// Appends an access log entry to a document and saves it.
    pub async fn log_document_access(
        &self,
        document_id: &str,
        user_id: &str,
        action: AccessAction,
    ) -> Result<Document, WorkspaceError> {
        let document = match self.documents.get(document_id) {
            Some(document) => document,
            None => self
                .documents
                .store()
                .get_by_id(document_id)
                .await?
                .ok_or_else(|| WorkspaceError::NotFound(format!("document {}", document_id)))?,
        };

        let logged = document.with_access(user_id, action, Utc::now());
        Ok(self.documents.update(logged).await?)
    }

    /// Appends an entry to the activity log. Failures are logged and
    /// yield `None`.
    pub async fn record_activity(
        &self,
        user_id: &str,
        action: &str,
        details: &str,
    ) -> Option<Activity> {
        match self
            .activities
            .create(ActivityDraft::new(user_id, action, details))
            .await
        {
            Ok(activity) => Some(activity),
            Err(e) => {
                tracing::warn!("Failed to record activity '{}': {}", action, e);
                None
            }
        }
    }
}

fn synced<R: arkive_core::Record>(pool: &SqlitePool, policy: MergePolicy) -> Synced<R> {
    SyncedCollection::with_policy(Arc::new(SqliteRecordStore::new(pool.clone())), policy)
}
