//! Key store trait

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Durable record of issued tokens and their issuance timestamps.
///
/// Implementations enforce token uniqueness themselves; callers never
/// check before inserting. Every single insert or delete is atomic with
/// respect to concurrent readers.
#[async_trait]
pub trait KeyStore: Send + Sync + Debug {
    /// Insert a token. Returns `false` when the token is already stored.
    async fn insert(&self, token: &str, issued_at: i64) -> Result<bool, DomainError>;

    /// Delete every row issued strictly before `cutoff`, returning how many went
    async fn delete_older_than(&self, cutoff: i64) -> Result<u64, DomainError>;

    /// Issuance timestamp of a stored token
    async fn lookup(&self, token: &str) -> Result<Option<i64>, DomainError>;

    /// Snapshot of every stored token, in no particular order
    async fn list_all(&self) -> Result<Vec<String>, DomainError>;

    /// Snapshot of every stored `(token, issued_at)` pair, in no particular order
    async fn list_entries(&self) -> Result<Vec<(String, i64)>, DomainError>;

    /// Number of stored tokens
    async fn count(&self) -> Result<u64, DomainError>;

    /// Check the backend can serve requests
    async fn health_check(&self) -> Result<(), DomainError> {
        self.count().await.map(|_| ())
    }
}
