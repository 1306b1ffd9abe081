use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::{Collection, Record};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Cheque,
    Card,
    Online,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::BankTransfer => write!(f, "bank transfer"),
            PaymentMethod::Cheque => write!(f, "cheque"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Online => write!(f, "online"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" | "bank" => Ok(PaymentMethod::BankTransfer),
            "cheque" | "check" => Ok(PaymentMethod::Cheque),
            "card" => Ok(PaymentMethod::Card),
            "online" => Ok(PaymentMethod::Online),
            _ => Err(format!(
                "Invalid payment method: '{}'. Valid options: cash, bank_transfer, cheque, card, online",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    pub client_name: String,
    pub client_cnic: String,
    pub amount: f64,
    #[serde(default)]
    pub nature_of_work: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(with = "timestamp::flexible")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(with = "timestamp::flexible")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::flexible_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ReceiptDraft {
    pub client_name: String,
    pub client_cnic: String,
    pub amount: f64,
    pub nature_of_work: String,
    pub payment_method: PaymentMethod,
    /// Receipt date; defaults to the creation instant.
    pub date: Option<DateTime<Utc>>,
    pub created_by: String,
}

impl ReceiptDraft {
    pub fn new(
        client_name: impl Into<String>,
        client_cnic: impl Into<String>,
        amount: f64,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            client_cnic: client_cnic.into(),
            amount,
            nature_of_work: String::new(),
            payment_method: PaymentMethod::default(),
            date: None,
            created_by: created_by.into(),
        }
    }

    pub fn with_nature_of_work(mut self, nature_of_work: impl Into<String>) -> Self {
        self.nature_of_work = nature_of_work.into();
        self
    }

    pub fn with_payment_method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

impl Record for Receipt {
    type Draft = ReceiptDraft;

    const COLLECTION: Collection = Collection::Receipts;

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn modified_at(&self) -> DateTime<Utc> {
        self.last_modified.unwrap_or(self.created_at)
    }

    fn from_draft(id: String, draft: ReceiptDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            client_name: draft.client_name,
            client_cnic: draft.client_cnic,
            amount: draft.amount,
            nature_of_work: draft.nature_of_work,
            payment_method: draft.payment_method,
            date: draft.date.unwrap_or(now),
            created_by: draft.created_by,
            created_at: now,
            last_modified: Some(now),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_modified = Some(now);
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Receipt {}", self.id)?;
        writeln!(f, "{}", "=".repeat(30))?;
        writeln!(f, "Client: {} ({})", self.client_name, self.client_cnic)?;
        writeln!(f, "Amount: {:.2}", self.amount)?;
        writeln!(f, "Paid by: {}", self.payment_method)?;
        writeln!(f, "Date: {}", self.date.format("%Y-%m-%d"))?;

        if !self.nature_of_work.is_empty() {
            writeln!(f, "Work: {}", self.nature_of_work)?;
        }

        Ok(())
    }
}
