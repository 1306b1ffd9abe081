use arkive_core::{timestamp, LocalStore, Record, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::marker::PhantomData;
use uuid::Uuid;

/// SQLite-backed Local Store Adapter for one record type.
///
/// All record types share the `records` table, partitioned by collection.
pub struct SqliteRecordStore<R> {
    pool: SqlitePool,
    _record: PhantomData<fn() -> R>,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    body: String,
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl<R: Record> SqliteRecordStore<R> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<R>, StoreError> {
        let row: Option<RecordRow> =
            sqlx::query_as("SELECT id, body FROM records WHERE collection = ? AND id = ?")
                .bind(R::COLLECTION.name())
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.map(|row| decode(&row)).transpose()
    }

    /// Records whose top-level JSON `field` equals `value`, newest first.
    pub async fn list_by_field(&self, field: &str, value: &str) -> Result<Vec<R>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            r#"
            SELECT id, body FROM records
            WHERE collection = ? AND json_extract(body, ?) = ?
            ORDER BY recency DESC
            "#,
        )
        .bind(R::COLLECTION.name())
        .bind(format!("$.{}", field))
        .bind(value)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(decode_rows(rows))
    }

    async fn insert(&self, record: &R) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO records (collection, id, body, recency) VALUES (?, ?, ?, ?)")
            .bind(R::COLLECTION.name())
            .bind(record.id())
            .bind(encode(record)?)
            .bind(timestamp::format(&record.recency()))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

fn encode<R: Record>(record: &R) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|e| StoreError::Encoding(e.to_string()))
}

fn decode<R: Record>(row: &RecordRow) -> Result<R, StoreError> {
    serde_json::from_str(&row.body)
        .map_err(|e| StoreError::Encoding(format!("{} {}: {}", R::COLLECTION, row.id, e)))
}

/// Decodes rows, skipping (and logging) any that no longer parse.
fn decode_rows<R: Record>(rows: Vec<RecordRow>) -> Vec<R> {
    rows.iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping unreadable row: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl<R: Record> LocalStore<R> for SqliteRecordStore<R> {
    async fn get_all(&self) -> Result<Vec<R>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, body FROM records WHERE collection = ? ORDER BY recency DESC",
        )
        .bind(R::COLLECTION.name())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(decode_rows(rows))
    }

    async fn create(&self, draft: R::Draft) -> Result<R, StoreError> {
        let record = R::from_draft(Uuid::new_v4().to_string(), draft, Utc::now());
        self.insert(&record).await?;
        tracing::debug!("Stored new {} record {}", R::COLLECTION, record.id());
        Ok(record)
    }

    async fn update(&self, record: &R) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO records (collection, id, body, recency) VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                body = excluded.body,
                recency = excluded.recency
            "#,
        )
        .bind(R::COLLECTION.name())
        .bind(record.id())
        .bind(encode(record)?)
        .bind(timestamp::format(&record.recency()))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(R::COLLECTION.name())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use arkive_core::{Client, ClientDraft, Receipt, ReceiptDraft};
    use tempfile::TempDir;

    struct TestContext {
        pool: SqlitePool,
        _temp_dir: TempDir,
    }

    impl TestContext {
        async fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
            Self {
                pool,
                _temp_dir: temp_dir,
            }
        }

        fn store<R: Record>(&self) -> SqliteRecordStore<R> {
            SqliteRecordStore::new(self.pool.clone())
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let ctx = TestContext::new().await;
        let store = ctx.store::<Client>();

        let created = store
            .create(ClientDraft::new("Ayesha Khan", "35202-1234567-1").with_email("a@example.com"))
            .await
            .unwrap();

        let fetched = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn test_get_all_newest_first() {
        let ctx = TestContext::new().await;
        let store = ctx.store::<Client>();

        let first = store.create(ClientDraft::new("First", "1")).await.unwrap();
        let second = store.create(ClientDraft::new("Second", "2")).await.unwrap();

        let mut touched = first.clone();
        touched.touch(Utc::now());
        store.update(&touched).await.unwrap();

        let all = store.get_all().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[tokio::test]
    async fn test_collections_are_partitioned() {
        let ctx = TestContext::new().await;
        ctx.store::<Client>()
            .create(ClientDraft::new("A", "1"))
            .await
            .unwrap();

        assert!(ctx.store::<Receipt>().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_inserts_unknown_record() {
        let ctx = TestContext::new().await;
        let store = ctx.store::<Client>();
        let draft = ClientDraft::new("R", "0");
        let remote = Client::from_draft("remote-1".into(), draft, Utc::now());

        store.update(&remote).await.unwrap();
        let stored = store.get_by_id("remote-1").await.unwrap();
        assert_eq!(stored, Some(remote.clone()));

        let mut renamed = remote.clone();
        renamed.name = "Renamed".to_string();
        store.update(&renamed).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let ctx = TestContext::new().await;
        let store = ctx.store::<Client>();
        let created = store.create(ClientDraft::new("A", "1")).await.unwrap();

        store.delete(&created.id).await.unwrap();
        store.delete(&created.id).await.unwrap();
        assert!(store.get_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_field() {
        let ctx = TestContext::new().await;
        let store = ctx.store::<Receipt>();

        store
            .create(ReceiptDraft::new("A", "111", 5000.0, "staff"))
            .await
            .unwrap();
        store
            .create(ReceiptDraft::new("B", "222", 1500.0, "staff"))
            .await
            .unwrap();
        store
            .create(ReceiptDraft::new("A", "111", 2500.0, "staff"))
            .await
            .unwrap();

        let receipts = store.list_by_field("clientCnic", "111").await.unwrap();
        assert_eq!(receipts.len(), 2);
        assert!(receipts.iter().all(|r| r.client_cnic == "111"));
        assert!(store.list_by_field("clientCnic", "999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_skipped() {
        let ctx = TestContext::new().await;
        let store = ctx.store::<Client>();
        store.create(ClientDraft::new("A", "1")).await.unwrap();

        sqlx::query("INSERT INTO records (collection, id, body, recency) VALUES ('clients', 'bad', '{\"id\":\"bad\"}', '2099-01-01T00:00:00.000000Z')")
            .execute(&ctx.pool)
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "A");
    }
}
