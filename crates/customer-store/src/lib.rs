use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Application-wide persisted customer identity.
#[async_trait]
pub trait CustomerIdStore: Send + Sync {
    async fn get(&self) -> Result<Option<String>, StoreError>;

    async fn set(&self, customer_id: &str) -> Result<(), StoreError>;

    async fn delete(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteCustomerStore {
    pool: SqlitePool,
}

impl SqliteCustomerStore {
    /// Opens (creating if needed) the store at `path`. `:memory:` keeps the
    /// identity for the life of the returned handle only.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let in_memory = path == ":memory:" || path == "sqlite::memory:";
        let options = SqliteConnectOptions::from_str(&sqlite_url(path))?.create_if_missing(true);
        // every in-memory connection is its own database
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options)
                .await?
        };

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS customer_identity (\
                slot INTEGER PRIMARY KEY CHECK (slot = 0),\
                customer_id TEXT NOT NULL,\
                updated_at INTEGER NOT NULL\
            )",
        )
        .execute(&pool)
        .await?;

        info!(path = %path, "customer store opened");

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CustomerIdStore for SqliteCustomerStore {
    async fn get(&self) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT customer_id FROM customer_identity WHERE slot = 0")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<String, _>("customer_id")))
    }

    async fn set(&self, customer_id: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO customer_identity (slot, customer_id, updated_at) VALUES (0, ?, ?) \
             ON CONFLICT(slot) DO UPDATE SET customer_id = excluded.customer_id, \
             updated_at = excluded.updated_at",
        )
        .bind(customer_id)
        .bind(unix_ms())
        .execute(&self.pool)
        .await?;

        debug!(customer_id, "customer id stored");
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM customer_identity")
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "customer id cleared");
        Ok(())
    }
}

fn sqlite_url(path: &str) -> String {
    if path == ":memory:" {
        "sqlite::memory:".to_string()
    } else if path.starts_with("sqlite:") {
        path.to_string()
    } else {
        format!("sqlite://{path}")
    }
}

fn unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
