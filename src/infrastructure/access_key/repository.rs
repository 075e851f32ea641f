//! In-memory key store implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{DomainError, KeyStore};

/// In-memory implementation of KeyStore
///
/// Every operation takes the lock exactly once, so a reader never sees a
/// partially applied insert or sweep.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyStore {
    keys: Arc<RwLock<HashMap<String, i64>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `(token, issued_at)` rows
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let keys: HashMap<String, i64> = keys
            .into_iter()
            .map(|(token, issued_at)| (token.into(), issued_at))
            .collect();

        Self {
            keys: Arc::new(RwLock::new(keys)),
        }
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn insert(&self, token: &str, issued_at: i64) -> Result<bool, DomainError> {
        let mut keys = self.keys.write().await;

        if keys.contains_key(token) {
            return Ok(false);
        }

        keys.insert(token.to_string(), issued_at);
        Ok(true)
    }

    async fn delete_older_than(&self, cutoff: i64) -> Result<u64, DomainError> {
        let mut keys = self.keys.write().await;
        let before = keys.len();

        keys.retain(|_, issued_at| *issued_at >= cutoff);

        Ok((before - keys.len()) as u64)
    }

    async fn lookup(&self, token: &str) -> Result<Option<i64>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.get(token).copied())
    }

    async fn list_all(&self) -> Result<Vec<String>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.keys().cloned().collect())
    }

    async fn list_entries(&self) -> Result<Vec<(String, i64)>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys
            .iter()
            .map(|(token, issued_at)| (token.clone(), *issued_at))
            .collect())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.len() as u64)
    }
}
