//! In-process feed hub.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use tokio::sync::mpsc;

use super::{FeedError, FeedSubscription, RemoteFeed, SubscriptionHandle};
use crate::record::Collection;

type Subscribers = Vec<(SubscriptionHandle, mpsc::UnboundedSender<serde_json::Value>)>;

/// Fans published snapshots out to every subscriber of a collection.
///
/// Used directly for in-process feeds and tests, and as the dispatch table
/// behind network feeds.
#[derive(Debug, Default)]
pub struct BroadcastFeed {
    channels: RwLock<HashMap<Collection, Subscribers>>,
    closed: AtomicBool,
}

impl BroadcastFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_channels(&self) -> RwLockWriteGuard<'_, HashMap<Collection, Subscribers>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers a payload to all current subscribers of `collection`.
    ///
    /// Returns how many subscribers received it. Subscribers whose receiver
    /// was dropped are pruned.
    pub fn publish(&self, collection: Collection, payload: serde_json::Value) -> usize {
        self.publish_with(collection, payload, |_| {})
    }

    /// Like [`publish`](Self::publish), calling `on_last` under the hub lock
    /// if pruning left the collection without subscribers.
    pub fn publish_with(
        &self,
        collection: Collection,
        payload: serde_json::Value,
        on_last: impl FnOnce(Collection),
    ) -> usize {
        let mut channels = self.write_channels();
        let Some(subscribers) = channels.get_mut(&collection) else {
            return 0;
        };

        let had_subscribers = !subscribers.is_empty();
        subscribers.retain(|(_, sender)| sender.send(payload.clone()).is_ok());
        if had_subscribers && subscribers.is_empty() {
            on_last(collection);
        }
        subscribers.len()
    }

    pub fn subscriber_count(&self, collection: Collection) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection)
            .map_or(0, Vec::len)
    }

    /// Subscribes to `collection`, calling `on_first` under the hub lock when
    /// it has no live subscribers yet. If `on_first` fails nothing is added.
    pub fn subscribe_with(
        &self,
        collection: Collection,
        on_first: impl FnOnce(Collection) -> Result<(), FeedError>,
    ) -> Result<FeedSubscription, FeedError> {
        let mut channels = self.write_channels();
        if self.is_closed() {
            return Err(FeedError::Closed);
        }

        let subscribers = channels.entry(collection).or_default();
        subscribers.retain(|(_, sender)| !sender.is_closed());
        if subscribers.is_empty() {
            on_first(collection)?;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = SubscriptionHandle::next();
        subscribers.push((handle, sender));

        Ok(FeedSubscription {
            handle,
            collection,
            receiver,
        })
    }

    /// Removes a subscription and returns its collection together with the
    /// number of subscribers left on it.
    pub fn detach(&self, handle: SubscriptionHandle) -> Option<(Collection, usize)> {
        self.detach_with(handle, |_| {})
    }

    /// Like [`detach`](Self::detach), calling `on_last` under the hub lock
    /// when the removed subscription was the last one of its collection.
    pub fn detach_with(
        &self,
        handle: SubscriptionHandle,
        on_last: impl FnOnce(Collection),
    ) -> Option<(Collection, usize)> {
        let mut channels = self.write_channels();
        for (collection, subscribers) in channels.iter_mut() {
            if let Some(pos) = subscribers.iter().position(|(h, _)| *h == handle) {
                subscribers.remove(pos);
                subscribers.retain(|(_, sender)| !sender.is_closed());
                if subscribers.is_empty() {
                    on_last(*collection);
                }
                return Some((*collection, subscribers.len()));
            }
        }
        None
    }

    /// Drops every subscriber and refuses new subscriptions.
    pub fn close(&self) {
        let mut channels = self.write_channels();
        self.closed.store(true, Ordering::SeqCst);
        channels.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RemoteFeed for BroadcastFeed {
    fn subscribe(&self, collection: Collection) -> Result<FeedSubscription, FeedError> {
        self.subscribe_with(collection, |_| Ok(()))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.detach(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_collection_subscribers_only() {
        let feed = BroadcastFeed::new();
        let mut clients = feed.subscribe(Collection::Clients).unwrap();
        let mut receipts = feed.subscribe(Collection::Receipts).unwrap();

        let delivered = feed.publish(Collection::Clients, json!([{"id": "c1"}]));
        assert_eq!(delivered, 1);

        assert_eq!(clients.receiver.recv().await.unwrap(), json!([{"id": "c1"}]));
        assert!(receipts.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delivery_is_fifo() {
        let feed = BroadcastFeed::new();
        let mut sub = feed.subscribe(Collection::Expenses).unwrap();

        for i in 0..5 {
            feed.publish(Collection::Expenses, json!(i));
        }
        for i in 0..5 {
            assert_eq!(sub.receiver.recv().await.unwrap(), json!(i));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let feed = BroadcastFeed::new();
        let mut sub = feed.subscribe(Collection::Documents).unwrap();
        let other = feed.subscribe(Collection::Documents).unwrap();

        assert_eq!(feed.detach(sub.handle), Some((Collection::Documents, 1)));
        assert_eq!(feed.publish(Collection::Documents, json!([])), 1);
        assert!(sub.receiver.recv().await.is_none());

        feed.unsubscribe(other.handle);
        assert_eq!(feed.subscriber_count(Collection::Documents), 0);
        assert_eq!(feed.detach(other.handle), None);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let feed = BroadcastFeed::new();
        let sub = feed.subscribe(Collection::Notifications).unwrap();
        drop(sub);

        assert_eq!(feed.publish(Collection::Notifications, json!([])), 0);
        assert_eq!(feed.subscriber_count(Collection::Notifications), 0);
    }

    #[test]
    fn test_closed_feed_refuses_subscriptions() {
        let feed = BroadcastFeed::new();
        feed.close();
        assert!(matches!(feed.subscribe(Collection::Clients), Err(FeedError::Closed)));
    }

    #[test]
    fn test_first_and_last_hooks() {
        let feed = BroadcastFeed::new();
        let mut firsts = Vec::new();

        let a = feed
            .subscribe_with(Collection::Clients, |c| {
                firsts.push(c);
                Ok(())
            })
            .unwrap();
        let b = feed
            .subscribe_with(Collection::Clients, |c| {
                firsts.push(c);
                Ok(())
            })
            .unwrap();
        assert_eq!(firsts, vec![Collection::Clients]);

        let mut lasts = Vec::new();
        feed.detach_with(a.handle, |c| lasts.push(c));
        assert!(lasts.is_empty());
        feed.detach_with(b.handle, |c| lasts.push(c));
        assert_eq!(lasts, vec![Collection::Clients]);
    }

    #[test]
    fn test_failed_first_hook_adds_nothing() {
        let feed = BroadcastFeed::new();
        let result = feed.subscribe_with(Collection::Receipts, |_| Err(FeedError::Closed));

        assert!(matches!(result, Err(FeedError::Closed)));
        assert_eq!(feed.subscriber_count(Collection::Receipts), 0);
    }

    #[test]
    fn test_pruning_last_receiver_fires_hook() {
        let feed = BroadcastFeed::new();
        let sub = feed.subscribe(Collection::Expenses).unwrap();
        drop(sub);

        let mut lasts = Vec::new();
        let delivered = feed.publish_with(Collection::Expenses, json!([]), |c| lasts.push(c));
        assert_eq!(delivered, 0);
        assert_eq!(lasts, vec![Collection::Expenses]);

        // already empty, nothing left to report
        feed.publish_with(Collection::Expenses, json!([]), |c| lasts.push(c));
        assert_eq!(lasts.len(), 1);
    }
}
