//! Access key infrastructure implementations
//!
//! This module provides key generation, the in-memory and SQLite key
//! stores, and the lifecycle engine that drives them.

mod factory;
mod generator;
mod repository;
mod service;
mod sqlite;

pub use factory::{KeyStoreFactory, StorageConfig, StorageType};
pub use generator::{
    FixedKeyGenerator, KeyGenerator, RandomKeyGenerator, SequenceKeyGenerator,
    DEFAULT_KEY_PREFIX, DEFAULT_SUFFIX_DIGITS, MAX_SUFFIX_DIGITS,
};
pub use repository::InMemoryKeyStore;
pub use service::{IssueReport, LifecycleEngine, RotationReport};
pub use sqlite::{SqliteConfig, SqliteKeyStore};
