use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::{Collection, Record};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cnic,
    TaxReturn,
    FinancialStatement,
    Contract,
    #[default]
    Other,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Cnic => write!(f, "cnic"),
            DocumentKind::TaxReturn => write!(f, "tax_return"),
            DocumentKind::FinancialStatement => write!(f, "financial_statement"),
            DocumentKind::Contract => write!(f, "contract"),
            DocumentKind::Other => write!(f, "other"),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cnic" => Ok(DocumentKind::Cnic),
            "tax_return" => Ok(DocumentKind::TaxReturn),
            "financial_statement" => Ok(DocumentKind::FinancialStatement),
            "contract" => Ok(DocumentKind::Contract),
            "other" => Ok(DocumentKind::Other),
            _ => Err(format!(
                "Invalid document type: '{}'. Valid options: cnic, tax_return, financial_statement, contract, other",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    View,
    Download,
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessAction::View => write!(f, "view"),
            AccessAction::Download => write!(f, "download"),
        }
    }
}

impl FromStr for AccessAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "view" => Ok(AccessAction::View),
            "download" => Ok(AccessAction::Download),
            _ => Err(format!(
                "Invalid access action: '{}'. Valid options: view, download",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub user_id: String,
    pub action: AccessAction,
    #[serde(with = "timestamp::flexible")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub client_cnic: String,
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(rename = "documentType", default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub uploaded_by: String,
    #[serde(with = "timestamp::flexible")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub access_log: Vec<AccessLogEntry>,
}

#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub client_cnic: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub kind: DocumentKind,
    pub tags: Vec<String>,
    pub uploaded_by: String,
}

impl DocumentDraft {
    pub fn new(
        client_cnic: impl Into<String>,
        file_name: impl Into<String>,
        uploaded_by: impl Into<String>,
    ) -> Self {
        Self {
            client_cnic: client_cnic.into(),
            file_name: file_name.into(),
            file_type: String::new(),
            file_size: 0,
            kind: DocumentKind::default(),
            tags: Vec::new(),
            uploaded_by: uploaded_by.into(),
        }
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl Document {
    /// Returns a copy with one more access log entry.
    pub fn with_access(
        &self,
        user_id: impl Into<String>,
        action: AccessAction,
        at: DateTime<Utc>,
    ) -> Self {
        let mut document = self.clone();
        document.access_log.push(AccessLogEntry {
            user_id: user_id.into(),
            action,
            timestamp: at,
        });
        document
    }
}

impl Record for Document {
    type Draft = DocumentDraft;

    const COLLECTION: Collection = Collection::Documents;

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.access_log
            .iter()
            .map(|entry| entry.timestamp)
            .max()
            .map_or(self.uploaded_at, |last| last.max(self.uploaded_at))
    }

    fn from_draft(id: String, draft: DocumentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            client_cnic: draft.client_cnic,
            file_name: draft.file_name,
            file_type: draft.file_type,
            file_size: draft.file_size,
            kind: draft.kind,
            tags: draft.tags,
            uploaded_by: draft.uploaded_by,
            uploaded_at: now,
            access_log: Vec::new(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.file_name)?;
        writeln!(f, "{}", "=".repeat(self.file_name.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Client CNIC: {}", self.client_cnic)?;
        writeln!(f, "Type: {}", self.kind)?;
        if !self.file_type.is_empty() {
            writeln!(f, "Format: {} ({} bytes)", self.file_type, self.file_size)?;
        }
        if !self.tags.is_empty() {
            writeln!(f, "Tags: {}", self.tags.join(", "))?;
        }
        writeln!(
            f,
            "Uploaded: {} by {}",
            self.uploaded_at.format("%Y-%m-%d %H:%M"),
            self.uploaded_by
        )?;

        if !self.access_log.is_empty() {
            writeln!(f, "\nAccess log:")?;
            for entry in &self.access_log {
                writeln!(
                    f,
                    "  {} {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.user_id,
                    entry.action
                )?;
            }
        }

        Ok(())
    }
}
