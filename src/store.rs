//! SQLite-backed [`ItemStore`].
//!
//! The whole item list is one JSON array stored under a fixed key in the
//! `kv` table. Reads of an absent key or a malformed value yield an empty
//! list; writes replace the value.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use webstash_core::models::Item;
use webstash_core::store::{decode_items, encode_items, ItemStore};

use crate::config::Config;
use crate::db;
use crate::migrate;

pub struct SqliteItemStore {
    pool: SqlitePool,
    key: String,
}

impl SqliteItemStore {
    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::ensure_schema(&pool).await?;
        Ok(Self {
            pool,
            key: config.db.storage_key.clone(),
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn load_all(&self) -> Result<Vec<Item>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await?;
        let raw: Option<String> = row.map(|r| r.get("value"));
        Ok(decode_items(raw.as_deref()))
    }

    async fn save_all(&self, items: &[Item]) -> Result<()> {
        let value = encode_items(items)?;
        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(&self.key)
        .bind(&value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
