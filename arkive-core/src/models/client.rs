use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::{Collection, Record};
use crate::timestamp;

/// Tax portal a client is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClientType {
    #[serde(rename = "IRIS")]
    Iris,
    #[serde(rename = "SECP")]
    Secp,
    #[serde(rename = "PRA")]
    Pra,
    #[default]
    Other,
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientType::Iris => write!(f, "IRIS"),
            ClientType::Secp => write!(f, "SECP"),
            ClientType::Pra => write!(f, "PRA"),
            ClientType::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "iris" => Ok(ClientType::Iris),
            "secp" => Ok(ClientType::Secp),
            "pra" => Ok(ClientType::Pra),
            "other" => Ok(ClientType::Other),
            _ => Err(format!(
                "Invalid client type: '{}'. Valid options: IRIS, SECP, PRA, Other",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub cnic: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "type", default)]
    pub client_type: ClientType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "timestamp::flexible")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::flexible")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::flexible_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientDraft {
    pub name: String,
    pub cnic: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub client_type: ClientType,
    pub notes: Option<String>,
}

impl ClientDraft {
    pub fn new(name: impl Into<String>, cnic: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cnic: cnic.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, client_type: ClientType) -> Self {
        self.client_type = client_type;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Client {
    /// Last modification instant, falling back to `updated_at`.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified.unwrap_or(self.updated_at)
    }
}

impl Record for Client {
    type Draft = ClientDraft;

    const COLLECTION: Collection = Collection::Clients;

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.last_modified()
    }

    fn from_draft(id: String, draft: ClientDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            cnic: draft.cnic,
            email: draft.email,
            phone: draft.phone,
            client_type: draft.client_type,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
            last_modified: Some(now),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.last_modified = Some(now);
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "CNIC: {}", self.cnic)?;
        writeln!(f, "Type: {}", self.client_type)?;

        if let Some(email) = &self.email {
            writeln!(f, "Email: {}", email)?;
        }
        if let Some(phone) = &self.phone {
            writeln!(f, "Phone: {}", phone)?;
        }
        if let Some(notes) = &self.notes {
            writeln!(f, "\nNotes: {}", notes)?;
        }

        writeln!(f, "\nUpdated: {}", self.updated_at.format("%Y-%m-%d %H:%M"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_draft_sets_timestamps() {
        let now = Utc::now();
        let draft = ClientDraft::new("Ayesha Khan", "35202-1234567-1").with_type(ClientType::Iris);
        let client = Client::from_draft("c1".to_string(), draft, now);

        assert_eq!(client.id(), "c1");
        assert_eq!(client.client_type, ClientType::Iris);
        assert_eq!(client.created_at, now);
        assert_eq!(client.recency(), now);
        assert_eq!(client.last_modified(), now);
    }

    #[test]
    fn test_decode_remote_shape() {
        let client: Client = serde_json::from_value(json!({
            "id": "c1",
            "name": "Ayesha Khan",
            "cnic": "35202-1234567-1",
            "type": "SECP",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": 1706745600000i64
        }))
        .unwrap();

        assert_eq!(client.client_type, ClientType::Secp);
        assert_eq!(client.updated_at.timestamp(), 1706745600);
        // missing lastModified falls back to updatedAt
        assert_eq!(client.last_modified(), client.updated_at);
        assert!(client.email.is_none());
    }

    #[test]
    fn test_touch_moves_recency() {
        let created = Utc::now() - chrono::Duration::hours(1);
        let mut client = Client::from_draft("c1".into(), ClientDraft::new("A", "1"), created);
        let now = Utc::now();
        client.touch(now);

        assert_eq!(client.updated_at, now);
        assert_eq!(client.created_at, created);
        assert_eq!(client.modified_at(), now);
    }

    #[test]
    fn test_client_type_from_str() {
        assert_eq!("iris".parse::<ClientType>().unwrap(), ClientType::Iris);
        assert_eq!("PRA".parse::<ClientType>().unwrap(), ClientType::Pra);
        assert!("fbr".parse::<ClientType>().is_err());
    }
}
