use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::{Collection, Record};
use crate::timestamp;

/// One entry of the audit trail: who did what, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub action: String,
    #[serde(default)]
    pub details: String,
    #[serde(with = "timestamp::flexible")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ActivityDraft {
    pub user_id: String,
    pub action: String,
    pub details: String,
}

impl ActivityDraft {
    pub fn new(
        user_id: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            action: action.into(),
            details: details.into(),
        }
    }
}

impl Record for Activity {
    type Draft = ActivityDraft;

    const COLLECTION: Collection = Collection::Activities;

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn from_draft(id: String, draft: ActivityDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            action: draft.action,
            details: draft.details,
            timestamp: now,
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.user_id,
            self.action,
            self.details
        )
    }
}
