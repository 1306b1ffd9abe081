//! WebSocket Remote Feed Adapter.
//!
//! Keeps one connection to a feed server and multiplexes every collection
//! over it. The first local subscriber of a collection sends `subscribe`;
//! the last one to leave sends `unsubscribe`. Incoming `snapshot` frames
//! are fanned out to local subscribers through a [`BroadcastFeed`].

use arkive_core::{
    BroadcastFeed, Collection, FeedError, FeedMessage, FeedSubscription, RemoteFeed,
    SubscriptionHandle,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub struct WsFeed {
    hub: Arc<BroadcastFeed>,
    outgoing: mpsc::UnboundedSender<FeedMessage>,
    reader: JoinHandle<()>,
}

impl WsFeed {
    /// Connects to a feed server.
    ///
    /// `http(s)://` URLs are mapped to `ws(s)://`; bare hosts get `ws://`.
    pub async fn connect(url: &str) -> Result<Self, FeedError> {
        let ws_url = build_ws_url(url);
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .map_err(|e| FeedError::Connection(e.to_string()))?;
        tracing::info!("Connected to feed at {}", ws_url);

        let (mut sender, mut receiver) = ws_stream.split();
        let (outgoing, mut queue) = mpsc::unbounded_channel::<FeedMessage>();
        let hub = Arc::new(BroadcastFeed::new());

        tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                let text = match message.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("Failed to encode feed message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    tracing::warn!("Feed send failed: {}", e);
                    break;
                }
            }
            let _ = sender.send(Message::Close(None)).await;
        });

        let reader_hub = Arc::clone(&hub);
        let reader_tx = outgoing.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => dispatch(&reader_hub, &reader_tx, text.as_str()),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {
                        // Ignore binary and control frames
                    }
                    Err(e) => {
                        tracing::warn!("Feed connection error: {}", e);
                        break;
                    }
                }
            }
            tracing::info!("Feed connection closed");
            reader_hub.close();
        });

        Ok(Self {
            hub,
            outgoing,
            reader,
        })
    }

    fn send(&self, message: FeedMessage) -> Result<(), FeedError> {
        self.outgoing.send(message).map_err(|_| FeedError::Closed)
    }
}

fn dispatch(hub: &BroadcastFeed, outgoing: &mpsc::UnboundedSender<FeedMessage>, text: &str) {
    match FeedMessage::decode(text) {
        Ok(FeedMessage::Snapshot {
            collection,
            records,
        }) => {
            // every local receiver is gone; stop the server sending
            let delivered = hub.publish_with(collection, records, |collection| {
                let _ = outgoing.send(FeedMessage::Unsubscribe { collection });
            });
            tracing::debug!("Dispatched {} snapshot to {} subscriber(s)", collection, delivered);
        }
        Ok(other) => tracing::debug!("Ignoring unexpected feed message: {:?}", other),
        Err(e) => tracing::warn!("Dropping malformed feed frame: {}", e),
    }
}

impl RemoteFeed for WsFeed {
    // Frames are queued under the hub lock so they follow the subscriber
    // count transitions in order.
    fn subscribe(&self, collection: Collection) -> Result<FeedSubscription, FeedError> {
        self.hub.subscribe_with(collection, |collection| {
            self.send(FeedMessage::Subscribe { collection })
        })
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.hub.detach_with(handle, |collection| {
            let _ = self.send(FeedMessage::Unsubscribe { collection });
        });
    }
}

impl Drop for WsFeed {
    fn drop(&mut self) {
        // The writer drains and closes once the reader and `outgoing` are gone.
        self.reader.abort();
    }
}

/// Normalizes a feed URL to a WebSocket URL.
fn build_ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if !url.starts_with("ws://") && !url.starts_with("wss://") {
        format!("ws://{}", url)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_build_ws_url_with_ws() {
        assert_eq!(build_ws_url("ws://localhost:8080"), "ws://localhost:8080");
    }

    #[test]
    fn test_build_ws_url_with_http() {
        assert_eq!(build_ws_url("http://localhost:8080/feed"), "ws://localhost:8080/feed");
    }

    #[test]
    fn test_build_ws_url_with_https() {
        assert_eq!(
            build_ws_url("https://feed.example.com"),
            "wss://feed.example.com"
        );
    }

    #[test]
    fn test_build_ws_url_bare_host() {
        assert_eq!(build_ws_url("localhost:8080"), "ws://localhost:8080");
    }

    async fn next_message<S>(ws: &mut S) -> FeedMessage
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let frame = ws.next().await.unwrap().unwrap();
            if let Message::Text(text) = frame {
                return FeedMessage::decode(text.as_str()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_subscribe_receive_unsubscribe() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let first = next_message(&mut ws).await;
            assert_eq!(
                first,
                FeedMessage::Subscribe {
                    collection: Collection::Clients
                }
            );

            let snapshot = FeedMessage::Snapshot {
                collection: Collection::Clients,
                records: json!([{"id": "c1"}]),
            };
            ws.send(Message::Text(snapshot.encode().unwrap().into()))
                .await
                .unwrap();

            next_message(&mut ws).await
        });

        let feed = WsFeed::connect(&format!("127.0.0.1:{}", addr.port()))
            .await
            .unwrap();
        let mut first = feed.subscribe(Collection::Clients).unwrap();
        let second = feed.subscribe(Collection::Clients).unwrap();

        let payload = timeout(WAIT, first.receiver.recv()).await.unwrap().unwrap();
        assert_eq!(payload, json!([{"id": "c1"}]));

        // only the last unsubscribe reaches the server
        feed.unsubscribe(first.handle);
        feed.unsubscribe(second.handle);

        let last = timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(
            last,
            FeedMessage::Unsubscribe {
                collection: Collection::Clients
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes_on_next_snapshot() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (dropped_tx, dropped_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            next_message(&mut ws).await;

            dropped_rx.await.unwrap();
            let snapshot = FeedMessage::Snapshot {
                collection: Collection::Documents,
                records: json!([]),
            };
            ws.send(Message::Text(snapshot.encode().unwrap().into()))
                .await
                .unwrap();

            next_message(&mut ws).await
        });

        let feed = WsFeed::connect(&format!("127.0.0.1:{}", addr.port()))
            .await
            .unwrap();
        let sub = feed.subscribe(Collection::Documents).unwrap();
        drop(sub);
        dropped_tx.send(()).unwrap();

        let last = timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(
            last,
            FeedMessage::Unsubscribe {
                collection: Collection::Documents
            }
        );
        assert_eq!(feed.hub.subscriber_count(Collection::Documents), 0);
    }

    #[tokio::test]
    async fn test_server_close_ends_subscriptions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            next_message(&mut ws).await;
            ws.close(None).await.unwrap();
        });

        let feed = WsFeed::connect(&format!("ws://127.0.0.1:{}", addr.port()))
            .await
            .unwrap();
        let mut sub = feed.subscribe(Collection::Receipts).unwrap();

        assert!(timeout(WAIT, sub.receiver.recv()).await.unwrap().is_none());
        assert!(matches!(
            feed.subscribe(Collection::Receipts),
            Err(FeedError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = WsFeed::connect(&format!("ws://127.0.0.1:{}", port)).await;
        assert!(matches!(result, Err(FeedError::Connection(_))));
    }
}
