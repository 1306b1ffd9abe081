//! Entity types and the record contract shared by every collection.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The entity types that have their own reconciled view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Clients,
    Receipts,
    Expenses,
    Notifications,
    Documents,
    Activities,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Clients,
        Collection::Receipts,
        Collection::Expenses,
        Collection::Notifications,
        Collection::Documents,
        Collection::Activities,
    ];

    /// Returns the collection name used in storage and on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Receipts => "receipts",
            Collection::Expenses => "expenses",
            Collection::Notifications => "notifications",
            Collection::Documents => "documents",
            Collection::Activities => "activities",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clients" | "client" => Ok(Collection::Clients),
            "receipts" | "receipt" => Ok(Collection::Receipts),
            "expenses" | "expense" => Ok(Collection::Expenses),
            "notifications" | "notification" => Ok(Collection::Notifications),
            "documents" | "document" => Ok(Collection::Documents),
            "activities" | "activity" => Ok(Collection::Activities),
            _ => Err(format!(
                "Invalid collection: '{}'. Valid options: clients, receipts, expenses, notifications, documents, activities",
                s
            )),
        }
    }
}

/// A fully typed, normalized record belonging to one [`Collection`].
///
/// The reconciliation layer only ever sees values of this trait: loosely
/// shaped input is decoded (and its timestamps normalized) by the adapters
/// before it gets here.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Fields supplied by the caller on creation; the store fills in the rest.
    type Draft: fmt::Debug + Send + Sync + 'static;

    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// The instant the reconciled view is ordered by (newest first).
    fn recency(&self) -> DateTime<Utc>;

    /// The instant of the last modification, used by
    /// [`MergePolicy::NewestWins`](crate::MergePolicy::NewestWins).
    fn modified_at(&self) -> DateTime<Utc> {
        self.recency()
    }

    /// Builds the canonical record from a draft, an assigned id and the
    /// creation instant.
    fn from_draft(id: String, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    /// Stamps modification fields before an update is applied.
    fn touch(&mut self, _now: DateTime<Utc>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Clients.name(), "clients");
        assert_eq!(Collection::Receipts.name(), "receipts");
        assert_eq!(Collection::Expenses.name(), "expenses");
        assert_eq!(Collection::Notifications.name(), "notifications");
        assert_eq!(Collection::Documents.name(), "documents");
        assert_eq!(Collection::Activities.name(), "activities");
    }

    #[test]
    fn test_collection_from_str() {
        assert_eq!("clients".parse::<Collection>(), Ok(Collection::Clients));
        assert_eq!("Receipt".parse::<Collection>(), Ok(Collection::Receipts));
        assert_eq!("activity".parse::<Collection>(), Ok(Collection::Activities));
        assert!("employees".parse::<Collection>().is_err());
    }

    #[test]
    fn test_collection_serde_matches_name() {
        for collection in Collection::ALL {
            let json = serde_json::to_string(&collection).unwrap();
            assert_eq!(json, format!("\"{}\"", collection.name()));
        }
    }
}
