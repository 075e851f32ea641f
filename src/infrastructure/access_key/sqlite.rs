//! SQLite key store with connection pooling
//!
//! One `keys` table (`id`, `key`, `created_at`), so an existing `keys.db`
//! from earlier deployments keeps working.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::domain::{DomainError, KeyStore};

/// SQLite storage configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file, created if missing
    pub path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long a writer waits on a locked database, in seconds
    pub busy_timeout_secs: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("keys.db"),
            max_connections: 4,
            busy_timeout_secs: 5,
        }
    }
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_busy_timeout(mut self, secs: u64) -> Self {
        self.busy_timeout_secs = secs;
        self
    }
}

/// SQLite implementation of KeyStore
///
/// Uniqueness is enforced by the `UNIQUE` constraint on `key`, so racing
/// batches cannot produce duplicate rows regardless of caller discipline.
#[derive(Debug, Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// Wrap an existing pool. Call [`ensure_table`](Self::ensure_table) before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database file and make sure the table exists
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DomainError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to open SQLite database {}: {}",
                    config.path.display(),
                    e
                ))
            })?;

        let store = Self::new(pool);
        store.ensure_table().await?;

        tracing::info!(path = %config.path.display(), "SQLite key store ready");

        Ok(store)
    }

    /// Private in-memory database, mainly for tests.
    ///
    /// The pool holds exactly one connection that never idles out; a second
    /// connection to `:memory:` would see a different, empty database.
    pub async fn in_memory() -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to open in-memory SQLite: {}", e)))?;

        let store = Self::new(pool);
        store.ensure_table().await?;
        Ok(store)
    }

    /// Creates the keys table and its index if absent
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                "key" TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create keys table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_keys_created_at ON keys (created_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create keys index: {}", e)))?;

        Ok(())
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn insert(&self, token: &str, issued_at: i64) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"INSERT INTO keys ("key", created_at) VALUES (?, ?) ON CONFLICT("key") DO NOTHING"#,
        )
        .bind(token)
        .bind(issued_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert key: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_older_than(&self, cutoff: i64) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM keys WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete expired keys: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn lookup(&self, token: &str) -> Result<Option<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>(r#"SELECT created_at FROM keys WHERE "key" = ?"#)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to look up key: {}", e)))
    }

    async fn list_all(&self) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar::<_, String>(r#"SELECT "key" FROM keys ORDER BY id"#)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list keys: {}", e)))
    }

    async fn list_entries(&self) -> Result<Vec<(String, i64)>, DomainError> {
        sqlx::query_as::<_, (String, i64)>(r#"SELECT "key", created_at FROM keys ORDER BY id"#)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list keys: {}", e)))
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM keys")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count keys: {}", e)))?;

        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("SQLite health check failed: {}", e)))?;

        Ok(())
    }
}
