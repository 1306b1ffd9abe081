//! Wire messages for network feeds.
//!
//! Messages are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "subscribe", "collection": "clients"}
//! {"type": "unsubscribe", "collection": "clients"}
//! {"type": "snapshot", "collection": "clients", "records": [...]}
//! ```

use serde::{Deserialize, Serialize};

use super::FeedError;
use crate::record::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Client asks to receive snapshots of a collection.
    Subscribe { collection: Collection },
    /// Client no longer wants snapshots of a collection.
    Unsubscribe { collection: Collection },
    /// Server pushes records of a collection. `records` is kept raw; it is
    /// validated when decoded into typed records.
    Snapshot {
        collection: Collection,
        #[serde(default)]
        records: serde_json::Value,
    },
}

impl FeedMessage {
    pub fn encode(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).map_err(|e| FeedError::Protocol(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, FeedError> {
        serde_json::from_str(text).map_err(|e| FeedError::Protocol(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_wire_format() {
        let msg = FeedMessage::Subscribe {
            collection: Collection::Receipts,
        };
        let encoded: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(encoded, json!({"type": "subscribe", "collection": "receipts"}));
    }

    #[test]
    fn test_decode_snapshot() {
        let msg = FeedMessage::decode(
            r#"{"type":"snapshot","collection":"clients","records":[{"id":"c1"}]}"#,
        )
        .unwrap();

        match msg {
            FeedMessage::Snapshot {
                collection,
                records,
            } => {
                assert_eq!(collection, Collection::Clients);
                assert_eq!(records, json!([{"id": "c1"}]));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_collection() {
        let result = FeedMessage::decode(r#"{"type":"subscribe","collection":"employees"}"#);
        assert!(matches!(result, Err(FeedError::Protocol(_))));
    }
}
