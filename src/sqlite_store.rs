//! SQLite-backed [`BlobStore`] implementation.
//!
//! Each blob is one row of the `blobs` table. Compare-and-swap is a single
//! conditional statement, so concurrent processes sharing the database file
//! cannot overwrite each other's writes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use batch_desk_core::store::{BatchStore, BlobStore, VersionedBlob};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`BlobStore`] trait.
pub struct SqliteBlobStore {
    pool: SqlitePool,
}

impl SqliteBlobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Connect, make sure the schema exists and wrap the pool in a [`BatchStore`].
pub async fn open_store(config: &Config) -> Result<BatchStore<SqliteBlobStore>> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;
    Ok(BatchStore::new(SqliteBlobStore::new(pool)).with_max_attempts(config.store.max_cas_attempts))
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn load(&self, key: &str) -> Result<Option<VersionedBlob>> {
        let row = sqlx::query("SELECT value, version FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load blob '{}'", key))?;

        Ok(row.map(|r| VersionedBlob {
            value: r.get("value"),
            version: r.get::<i64, _>("version") as u64,
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<Option<u64>> {
        let now = chrono::Utc::now().timestamp();

        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO blobs (key, value, version, updated_at)
                    VALUES (?, ?, 1, ?)
                    ON CONFLICT(key) DO NOTHING
                    "#,
                )
                .bind(key)
                .bind(value)
                .bind(now)
                .execute(&self.pool)
                .await
            }
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE blobs
                    SET value = ?, version = version + 1, updated_at = ?
                    WHERE key = ? AND version = ?
                    "#,
                )
                .bind(value)
                .bind(now)
                .bind(key)
                .bind(version as i64)
                .execute(&self.pool)
                .await
            }
        }
        .with_context(|| format!("Failed to write blob '{}'", key))?;

        if result.rows_affected() == 1 {
            Ok(Some(expected.map_or(1, |v| v + 1)))
        } else {
            Ok(None)
        }
    }
}
