//! Remote Feed Adapter contract.
//!
//! A remote feed pushes snapshots of a collection whenever the backing cloud
//! store changes. Each delivery is a raw JSON payload holding zero or more
//! records; it may be the whole collection or only part of it. Payloads are
//! turned into typed records by [`decode_snapshot`] before they reach the
//! reconciled view.

mod decode;
mod hub;
mod protocol;

pub use decode::decode_snapshot;
pub use hub::BroadcastFeed;
pub use protocol::FeedMessage;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::record::Collection;

/// Errors raised by a remote feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed connection error: {0}")]
    Connection(String),

    #[error("Feed protocol error: {0}")]
    Protocol(String),

    #[error("Feed is closed")]
    Closed,
}

/// Identifies one subscription so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Allocates a process-unique handle.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// An active subscription: payloads for one collection, in delivery order.
#[derive(Debug)]
pub struct FeedSubscription {
    pub handle: SubscriptionHandle,
    pub collection: Collection,
    pub receiver: mpsc::UnboundedReceiver<serde_json::Value>,
}

/// Push-based source of remote snapshots.
pub trait RemoteFeed: Send + Sync {
    fn subscribe(&self, collection: Collection) -> Result<FeedSubscription, FeedError>;

    /// Stops delivery for `handle`. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}
