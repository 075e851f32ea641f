//! keypool
//!
//! Issues, stores, validates and expires opaque bearer access keys. Keys
//! self-expire after a fixed TTL and a background scheduler keeps the pool
//! replenished, so there is no separate revocation step.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use domain::SystemClock;
use infrastructure::access_key::{KeyStoreFactory, LifecycleEngine};

/// Build the lifecycle engine for a validated configuration
pub async fn create_engine(config: &AppConfig) -> anyhow::Result<Arc<LifecycleEngine>> {
    let storage = config.storage_config()?;
    let store = KeyStoreFactory::create(&storage).await?;
    let generator = config.key_generator()?;
    let ttl = config.key_ttl()?;

    info!(
        backend = ?storage.storage_type(),
        prefix = %generator.prefix(),
        keyspace = generator.keyspace(),
        ttl_secs = ttl.as_secs(),
        "Key store ready"
    );

    let engine = LifecycleEngine::new(store)
        .with_generator(Arc::new(generator))
        .with_clock(Arc::new(SystemClock))
        .with_ttl(ttl);

    Ok(Arc::new(engine))
}

/// Create application state with the given configuration
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    Ok(AppState::new(create_engine(config).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.backend = "memory".to_string();
        config
    }

    #[tokio::test]
    async fn test_create_engine_from_config() {
        let mut config = in_memory_config();
        config.keys.prefix = "T_".to_string();
        config.keys.ttl_secs = 60;

        let engine = create_engine(&config).await.unwrap();
        assert_eq!(engine.ttl().as_secs(), 60);

        let report = engine.issue_batch(3).await.unwrap();
        assert_eq!(report.inserted, 3);

        let keys = engine.list_active(engine.now()).await.unwrap();
        assert!(keys.iter().all(|key| key.starts_with("T_")));
    }

    #[tokio::test]
    async fn test_create_engine_rejects_bad_config() {
        let mut config = in_memory_config();
        config.storage.backend = "postgres".to_string();
        assert!(create_engine(&config).await.is_err());

        let mut config = in_memory_config();
        config.keys.ttl_secs = 0;
        assert!(create_engine(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_create_app_state() {
        let state = create_app_state(&in_memory_config()).await.unwrap();
        assert_eq!(state.engine.stored_count().await.unwrap(), 0);
    }
}
