use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::{Collection, Record};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Info => write!(f, "info"),
            NotificationKind::Warning => write!(f, "warning"),
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Error => write!(f, "error"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(NotificationKind::Info),
            "warning" | "warn" => Ok(NotificationKind::Warning),
            "success" => Ok(NotificationKind::Success),
            "error" => Ok(NotificationKind::Error),
            _ => Err(format!(
                "Invalid notification type: '{}'. Valid options: info, warning, success, error",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "timestamp::flexible")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub message: String,
    pub kind: NotificationKind,
}

impl NotificationDraft {
    pub fn new(message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Notification {
    /// Returns a copy marked as read.
    pub fn mark_read(&self) -> Self {
        Self {
            read: true,
            ..self.clone()
        }
    }
}

impl Record for Notification {
    type Draft = NotificationDraft;

    const COLLECTION: Collection = Collection::Notifications;

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: String, draft: NotificationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            message: draft.message,
            kind: draft.kind,
            read: false,
            created_at: now,
        }
    }
}
