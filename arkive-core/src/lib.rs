//! Arkive Core Library
//!
//! Typed records and the local/remote reconciliation layer shared by Arkive
//! applications.

pub mod collection;
pub mod feed;
pub mod models;
pub mod reconcile;
pub mod record;
pub mod store;
pub mod timestamp;

pub use collection::{Snapshot, SyncState, SyncedCollection};
pub use feed::{
    decode_snapshot, BroadcastFeed, FeedError, FeedMessage, FeedSubscription, RemoteFeed,
    SubscriptionHandle,
};
pub use models::{
    AccessAction, AccessLogEntry, Activity, ActivityDraft, Client, ClientDraft, ClientType,
    Document, DocumentDraft, DocumentKind, Expense, ExpenseCategory, ExpenseDraft, Notification,
    NotificationDraft, NotificationKind, PaymentMethod, Receipt, ReceiptDraft,
};
pub use reconcile::{LocalMutation, MergePolicy, MergeStats, PendingChange, ReconciledView};
pub use record::{Collection, Record};
pub use store::{LocalStore, MemoryStore, StoreError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
