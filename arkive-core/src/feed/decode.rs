use serde_json::Value;

use crate::record::Record;

/// Decodes a remote payload into typed records.
///
/// Returns `None` when the payload is not an array; the caller treats that as
/// "no update this cycle". Entries without a non-empty string `id`, or that
/// fail to decode (including unparseable timestamps), are skipped one by one.
pub fn decode_snapshot<R: Record>(payload: &Value) -> Option<Vec<R>> {
    let Some(items) = payload.as_array() else {
        tracing::warn!(
            "Ignoring {} snapshot: expected an array, got {}",
            R::COLLECTION,
            kind_of(payload)
        );
        return None;
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let id = item.get("id").and_then(Value::as_str).unwrap_or_default();
        if id.is_empty() {
            tracing::debug!("Skipping {} entry without an id", R::COLLECTION);
            continue;
        }

        match serde_json::from_value::<R>(item.clone()) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Skipping malformed {} record {}: {}", R::COLLECTION, id, e);
            }
        }
    }

    Some(records)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
