//! Timestamp normalization for record fields.
//!
//! Remote and legacy local payloads carry instants in several shapes: RFC 3339
//! strings, naive date-time or date-only strings, epoch milliseconds (a
//! serialized native date) and Firestore `{seconds, nanoseconds}` objects.
//! Every shape is normalized to a `DateTime<Utc>` while decoding; records
//! always serialize back as RFC 3339 UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Text(String),
    Millis(i64),
    FractionalMillis(f64),
    Firestore {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(alias = "_nanoseconds", default)]
        nanoseconds: u32,
    },
}

impl RawInstant {
    fn into_instant(self) -> Result<DateTime<Utc>, String> {
        match self {
            RawInstant::Text(s) => {
                parse_text(&s).ok_or_else(|| format!("invalid timestamp '{}'", s))
            }
            RawInstant::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| format!("epoch milliseconds out of range: {}", ms)),
            RawInstant::FractionalMillis(ms) => {
                if !ms.is_finite() {
                    return Err(format!("invalid epoch milliseconds: {}", ms));
                }
                Utc.timestamp_millis_opt(ms.round() as i64)
                    .single()
                    .ok_or_else(|| format!("epoch milliseconds out of range: {}", ms))
            }
            RawInstant::Firestore {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(seconds, nanoseconds)
                .ok_or_else(|| format!("timestamp out of range: {}s {}ns", seconds, nanoseconds)),
        }
    }
}

/// Parses a textual instant in any of the accepted string shapes.
pub fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalizes a JSON value holding an instant.
pub fn normalize(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    serde_json::from_value::<RawInstant>(value.clone())
        .ok()
        .and_then(|raw| raw.into_instant().ok())
}

/// Canonical text form: RFC 3339, UTC, microsecond precision.
///
/// Fixed width, so the strings sort in chronological order.
pub fn format(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serde adapter for `DateTime<Utc>` fields.
pub mod flexible {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        RawInstant::deserialize(deserializer)?
            .into_instant()
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` fields; use with `#[serde(default)]`.
pub mod flexible_option {
    use super::*;

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => serializer.serialize_some(&format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<RawInstant>::deserialize(deserializer)? {
            Some(raw) => raw.into_instant().map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let parsed = parse_text("2024-03-01T15:00:00+05:00").unwrap();
        assert_eq!(parsed, utc(2024, 3, 1, 10, 0, 0));
    }

    #[test]
    fn test_naive_and_date_only_strings() {
        assert_eq!(
            parse_text("2024-03-01 10:30:00").unwrap(), utc(2024, 3, 1, 10, 30,
            0)
        );
        assert_eq!(
            parse_text("2024-03-01T10:30:00.250").unwrap(),
            utc(2024, 3, 1, 10, 30, 0) + chrono::Duration::milliseconds(250)
        );
        assert_eq!(parse_text("2024-03-01").unwrap(), utc(2024, 3, 1, 0, 0, 0));
        assert!(parse_text("yesterday").is_none());
    }

    #[test]
    fn test_normalize_json_shapes() {
        let expected = utc(2024, 3, 1, 10, 0, 0);
        let millis = expected.timestamp_millis();

        assert_eq!(normalize(&json!("2024-03-01T10:00:00Z")), Some(expected));
        assert_eq!(normalize(&json!(millis)), Some(expected));
        assert_eq!(normalize(&json!(millis as f64)), Some(expected));
        assert_eq!(
            normalize(&json!({"seconds": expected.timestamp(), "nanoseconds": 0})),
            Some(expected)
        );
        assert_eq!(
            normalize(&json!({"_seconds": expected.timestamp(), "_nanoseconds": 0})),
            Some(expected)
        );
        assert_eq!(normalize(&json!(null)), None);
        assert_eq!(normalize(&json!("not a date")), None);
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "flexible")]
        at: DateTime<Utc>,
        #[serde(default, with = "flexible_option")]
        seen: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_serde_adapters() {
        let parsed: Stamped = serde_json::from_value(json!({"at": "2024-03-01"})).unwrap();
        assert_eq!(parsed.at, utc(2024, 3, 1, 0, 0, 0));
        assert!(parsed.seen.is_none());

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["at"], json!("2024-03-01T00:00:00.000000Z"));

        let invalid = serde_json::from_value::<Stamped>(json!({"at": "soon"}));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_format_sorts_chronologically() {
        let earlier = format(&utc(2024, 3, 1, 9, 59, 59));
        let later = format(&utc(2024, 3, 1, 10, 0, 0));
        assert!(earlier < later);
    }
}
