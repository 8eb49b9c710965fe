//! SQLite backend.
//!
//! A single `items` table keyed by `(namespace, key)`. The integer `seq`
//! column records first insertion; upserts leave it untouched, which is what
//! gives `search` its stable insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailgate_core::error::StoreError;
use mailgate_core::store::{DecisionStore, Namespace, StoredItem};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed decision store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database lives per connection, so pin the pool to one.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite decision store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                namespace   TEXT NOT NULL,
                key         TEXT NOT NULL,
                value       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(namespace, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("items table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_namespace ON items(namespace, seq)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("namespace index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_item(namespace: &Namespace, row: &sqlx::sqlite::SqliteRow) -> Result<StoredItem, StoreError> {
        let key: String = row
            .try_get("key")
            .map_err(|e| StoreError::QueryFailed(format!("key column: {e}")))?;
        let raw: String = row
            .try_get("value")
            .map_err(|e| StoreError::QueryFailed(format!("value column: {e}")))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;
        let updated_at: String = row
            .try_get("updated_at")
            .map_err(|e| StoreError::QueryFailed(format!("updated_at column: {e}")))?;

        let value = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Serialization(format!("{namespace}/{key}: {e}")))?;

        Ok(StoredItem {
            namespace: namespace.clone(),
            key,
            value,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl DecisionStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<StoredItem>, StoreError> {
        let row = sqlx::query(
            "SELECT key, value, created_at, updated_at FROM items WHERE namespace = ?1 AND key = ?2",
        )
        .bind(namespace.path())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("SELECT failed: {e}")))?;

        row.map(|r| Self::row_to_item(namespace, &r)).transpose()
    }

    async fn put(&self, namespace: &Namespace, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO items (namespace, key, value, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(namespace.path())
        .bind(key)
        .bind(&raw)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("UPSERT failed: {e}")))?;

        debug!(namespace = %namespace, key, "Stored item");
        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE namespace = ?1 AND key = ?2")
            .bind(namespace.path())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("DELETE failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, namespace: &Namespace) -> Result<Vec<StoredItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT key, value, created_at, updated_at FROM items WHERE namespace = ?1 ORDER BY seq ASC",
        )
        .bind(namespace.path())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Namespace scan: {e}")))?;

        rows.iter().map(|r| Self::row_to_item(namespace, r)).collect()
    }
}
