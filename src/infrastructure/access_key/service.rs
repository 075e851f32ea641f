//! Key lifecycle engine
//!
//! Orchestrates batch issuance and expiry sweeps against a [`KeyStore`] and
//! answers validation queries. All store mutation goes through here.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Clock, DomainError, KeyStatus, KeyStore, KeyTtl, SystemClock};

use super::generator::{KeyGenerator, RandomKeyGenerator};

/// Result of one batch issuance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueReport {
    /// Number of candidate tokens generated
    pub requested: usize,
    /// Rows actually written
    pub inserted: usize,
    /// Candidates dropped because the token already existed
    pub duplicates: usize,
}

/// Result of a sweep followed by a batch issuance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    pub swept: u64,
    pub issued: IssueReport,
}

/// Lifecycle engine for access keys
#[derive(Debug, Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn KeyStore>,
    generator: Arc<dyn KeyGenerator>,
    clock: Arc<dyn Clock>,
    ttl: KeyTtl,
}

impl LifecycleEngine {
    /// Create an engine with the default generator, system clock and 24h TTL
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            generator: Arc::new(RandomKeyGenerator::default()),
            clock: Arc::new(SystemClock),
            ttl: KeyTtl::default(),
        }
    }

    /// Create with a custom generator
    pub fn with_generator(mut self, generator: Arc<dyn KeyGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Create with a custom clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create with a custom TTL
    pub fn with_ttl(mut self, ttl: KeyTtl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> KeyTtl {
        self.ttl
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Current time according to the engine's clock
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Issue `n` keys stamped with the current time
    pub async fn issue_batch(&self, n: usize) -> Result<IssueReport, DomainError> {
        self.issue_batch_at(n, self.now()).await
    }

    /// Issue `n` keys stamped with `now`.
    ///
    /// Colliding tokens are dropped and counted. Each insert commits on its
    /// own; a storage failure aborts the rest of the batch but keeps the
    /// rows already written.
    pub async fn issue_batch_at(&self, n: usize, now: i64) -> Result<IssueReport, DomainError> {
        let mut report = IssueReport {
            requested: n,
            ..Default::default()
        };

        for _ in 0..n {
            let token = self.generator.generate();

            if self.store.insert(&token, now).await? {
                report.inserted += 1;
            } else {
                debug!(token = %token, "Key already exists, skipping");
                report.duplicates += 1;
            }
        }

        counter!("keys_issued_total").increment(report.inserted as u64);
        counter!("keys_duplicate_total").increment(report.duplicates as u64);

        info!(
            requested = report.requested,
            inserted = report.inserted,
            duplicates = report.duplicates,
            "Issued key batch"
        );

        Ok(report)
    }

    /// Delete every key whose TTL had run out at `now`
    pub async fn sweep_expired(&self, now: i64) -> Result<u64, DomainError> {
        let cutoff = self.ttl.cutoff(now);
        let removed = self.store.delete_older_than(cutoff).await?;

        counter!("keys_swept_total").increment(removed);
        info!(cutoff, removed, "Swept expired keys");

        Ok(removed)
    }

    /// Sweep, then replenish with a fresh batch stamped `now`
    pub async fn rotate(&self, n: usize, now: i64) -> Result<RotationReport, DomainError> {
        let swept = self.sweep_expired(now).await?;
        let issued = self.issue_batch_at(n, now).await?;

        Ok(RotationReport { swept, issued })
    }

    /// Check a presented token. Never deletes anything.
    pub async fn validate(&self, token: &str, now: i64) -> Result<KeyStatus, DomainError> {
        let issued_at = self.store.lookup(token).await?;
        let status = self.ttl.status(issued_at, now);

        counter!("key_validations_total", "outcome" => status.as_str()).increment(1);
        debug!(status = %status, "Validated key");

        Ok(status)
    }

    /// Every stored token, including expired ones that have not been swept yet
    pub async fn list_active(&self, _now: i64) -> Result<Vec<String>, DomainError> {
        self.store.list_all().await
    }

    /// Only the tokens that would validate as [`KeyStatus::Valid`] at `now`
    pub async fn list_valid(&self, now: i64) -> Result<Vec<String>, DomainError> {
        let entries = self.store.list_entries().await?;

        Ok(entries
            .into_iter()
            .filter(|(_, issued_at)| self.ttl.is_valid(*issued_at, now))
            .map(|(token, _)| token)
            .collect())
    }

    /// Number of stored keys, valid or not
    pub async fn stored_count(&self) -> Result<u64, DomainError> {
        self.store.count().await
    }
}
