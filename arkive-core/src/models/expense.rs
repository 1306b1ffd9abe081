use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::{Collection, Record};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Office,
    Utilities,
    Rent,
    Salary,
    Travel,
    #[default]
    Other,
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpenseCategory::Office => write!(f, "office"),
            ExpenseCategory::Utilities => write!(f, "utilities"),
            ExpenseCategory::Rent => write!(f, "rent"),
            ExpenseCategory::Salary => write!(f, "salary"),
            ExpenseCategory::Travel => write!(f, "travel"),
            ExpenseCategory::Other => write!(f, "other"),
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "office" => Ok(ExpenseCategory::Office),
            "utilities" => Ok(ExpenseCategory::Utilities),
            "rent" => Ok(ExpenseCategory::Rent),
            "salary" => Ok(ExpenseCategory::Salary),
            "travel" => Ok(ExpenseCategory::Travel),
            "other" => Ok(ExpenseCategory::Other),
            _ => Err(format!(
                "Invalid expense category: '{}'. Valid options: office, utilities, rent, salary, travel, other",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category: ExpenseCategory,
    #[serde(with = "timestamp::flexible")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(with = "timestamp::flexible")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub date: Option<DateTime<Utc>>,
    pub created_by: String,
}

impl ExpenseDraft {
    pub fn new(description: impl Into<String>, amount: f64, created_by: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            amount,
            category: ExpenseCategory::default(),
            date: None,
            created_by: created_by.into(),
        }
    }

    pub fn with_category(mut self, category: ExpenseCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

impl Record for Expense {
    type Draft = ExpenseDraft;

    const COLLECTION: Collection = Collection::Expenses;

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(id: String, draft: ExpenseDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            description: draft.description,
            amount: draft.amount,
            category: draft.category,
            date: draft.date.unwrap_or(now),
            created_by: draft.created_by,
            created_at: now,
        }
    }
}

impl fmt::Display for Expense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        writeln!(f, "{}", "=".repeat(self.description.len()))?;
        writeln!(f, "Amount: {:.2}", self.amount)?;
        writeln!(f, "Category: {}", self.category)?;
        writeln!(f, "Date: {}", self.date.format("%Y-%m-%d"))?;
        Ok(())
    }
}
