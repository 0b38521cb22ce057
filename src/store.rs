//! Record of article URLs that have already been collected.

use crate::error::Result;
use crate::utils::normalize_url;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Duplicate detection for collected articles. URLs differing only by a
/// trailing `/` are the same article.
pub trait UrlStore {
    async fn exists(&self, url: &str) -> Result<bool>;
    async fn add(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteUrlStore {
    pool: SqlitePool,
}

impl SqliteUrlStore {
    /// Open (creating if needed) the database and its `URL` table.
    #[instrument(level = "info", skip_all, fields(%database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            if let Some(dir) = options.get_filename().parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        // Each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(options)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS URL (Id INTEGER PRIMARY KEY, Value TEXT NOT NULL UNIQUE)",
        )
        .execute(&pool)
        .await?;
        info!("URL store ready");
        Ok(Self { pool })
    }
}

impl UrlStore for SqliteUrlStore {
    async fn exists(&self, url: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM URL WHERE Value = ?")
            .bind(normalize_url(url))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn add(&self, url: &str) -> Result<()> {
        let result = sqlx::query("INSERT OR IGNORE INTO URL (Value) VALUES (?)")
            .bind(normalize_url(url))
            .execute(&self.pool)
            .await?;
        debug!(%url, inserted = result.rows_affected(), "Recorded collected URL");
        Ok(())
    }
}
