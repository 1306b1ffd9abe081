//! Local Store Adapter contract.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

use crate::record::Record;

/// Errors raised by a local store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Backend(String),

    #[error("Failed to encode or decode record: {0}")]
    Encoding(String),
}

/// On-device persistence for one record type.
///
/// `create` assigns the id and creation timestamps and returns the canonical
/// record; the reconciliation layer never invents ids itself.
#[async_trait]
pub trait LocalStore<R: Record>: Send + Sync {
    async fn get_all(&self) -> Result<Vec<R>, StoreError>;

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError>;

    /// Writes `record`, inserting it if its id is not stored yet. Records
    /// that only ever arrived from the remote feed take this path on their
    /// first local edit.
    async fn update(&self, record: &R) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory store, handy for tests and for running without a database.
///
/// Can be switched into a failing mode to exercise error paths.
#[derive(Debug)]
pub struct MemoryStore<R> {
    records: Mutex<Vec<R>>,
    failing: AtomicBool,
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_records(records: Vec<R>) -> Self {
        Self {
            records: Mutex::new(records),
            failing: AtomicBool::new(false),
        }
    }

    /// When set, every operation fails with [`StoreError::Backend`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of the stored records, in insertion order.
    pub fn records(&self) -> Vec<R> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> LocalStore<R> for MemoryStore<R> {
    async fn get_all(&self) -> Result<Vec<R>, StoreError> {
        self.check()?;
        Ok(self.records())
    }

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        self.check()?;
        let record = R::from_draft(Uuid::new_v4().to_string(), draft, Utc::now());
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: &R) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check()?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|r| r.id() != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Expense, ExpenseDraft};

    #[tokio::test]
    async fn test_create_assigns_id() {
        let store = MemoryStore::<Expense>::new();
        let created = store
            .create(ExpenseDraft::new("Stationery", 800.0, "admin"))
            .await
            .unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(store.get_all().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_update_inserts_unknown_record() {
        let store = MemoryStore::<Expense>::new();
        let created = store
            .create(ExpenseDraft::new("Stationery", 800.0, "admin"))
            .await
            .unwrap();
        store.delete(&created.id).await.unwrap();

        store.update(&created).await.unwrap();
        assert_eq!(store.records(), vec![created.clone()]);

        let mut edited = created.clone();
        edited.amount = 950.0;
        store.update(&edited).await.unwrap();
        assert_eq!(store.records(), vec![edited]);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let store = MemoryStore::<Expense>::new();
        store.set_failing(true);
        assert!(matches!(store.get_all().await, Err(StoreError::Backend(_))));

        store.set_failing(false);
        assert!(store.get_all().await.unwrap().is_empty());
    }
}
