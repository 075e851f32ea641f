//! Key store factory for runtime backend selection

use std::sync::Arc;

use crate::domain::{DomainError, KeyStore};

use super::repository::InMemoryKeyStore;
use super::sqlite::{SqliteConfig, SqliteKeyStore};

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// SQLite database file
    Sqlite,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "sqlite" | "sqlite3" | "file" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Sqlite(SqliteConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn sqlite(config: SqliteConfig) -> Self {
        Self::Sqlite(config)
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Sqlite(_) => StorageType::Sqlite,
        }
    }
}

/// Factory for creating key stores
#[derive(Debug)]
pub struct KeyStoreFactory;

impl KeyStoreFactory {
    /// Creates a key store based on the configuration
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn KeyStore>, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(Arc::new(InMemoryKeyStore::new())),
            StorageConfig::Sqlite(sqlite_config) => {
                Ok(Arc::new(SqliteKeyStore::connect(sqlite_config).await?))
            }
        }
    }
}
