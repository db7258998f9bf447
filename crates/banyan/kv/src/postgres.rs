//! PostgreSQL backend for the key-value contract.
//!
//! One table holds the entire namespace: `key TEXT PRIMARY KEY, value
//! JSONB`. Prefix scans compile to `LIKE 'prefix%' ORDER BY key`, backed by
//! a `text_pattern_ops` index so the plan stays an index range scan under
//! any collation.

use crate::traits::KvStore;
use crate::{KvError, KvResult};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;

/// PostgreSQL-backed key-value store.
#[derive(Clone)]
pub struct PostgresKvStore {
    pool: PgPool,
}

impl PostgresKvStore {
    /// Connect to PostgreSQL and initialize the required schema.
    pub async fn connect(database_url: &str) -> KvResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> KvResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| KvError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the store from an existing pool.
    pub async fn from_pool(pool: PgPool) -> KvResult<Self> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> KvResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS banyan_kv (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS banyan_kv_key_pattern
                ON banyan_kv (key text_pattern_ops)
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| KvError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for PostgresKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<Value>> {
        let row = sqlx::query("SELECT value FROM banyan_kv WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;

        row.map(|r| {
            r.try_get::<Value, _>("value")
                .map_err(|e| KvError::Backend(e.to_string()))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> KvResult<()> {
        sqlx::query(
            r#"
            INSERT INTO banyan_kv (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| KvError::Backend(e.to_string()))?;

        debug!(key = %key, "stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        sqlx::query("DELETE FROM banyan_kv WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| KvError::Backend(e.to_string()))?;

        debug!(key = %key, "deleted key");
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> KvResult<Vec<Value>> {
        if prefix.is_empty() {
            return Err(KvError::InvalidInput(
                "scan prefix must not be empty".to_string(),
            ));
        }

        let rows = sqlx::query(
            r#"
            SELECT value FROM banyan_kv
             WHERE key LIKE $1
             ORDER BY key
            "#,
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KvError::Backend(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                row.try_get::<Value, _>("value")
                    .map_err(|e| KvError::Backend(e.to_string()))
            })
            .collect()
    }
}

// % and _ are LIKE wildcards; a literal prefix must not match as a pattern.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
