use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::domain::{DomainError, KeyTtl, DEFAULT_TTL_SECS};
use crate::infrastructure::access_key::{
    RandomKeyGenerator, SqliteConfig, StorageConfig, StorageType, DEFAULT_KEY_PREFIX,
    DEFAULT_SUFFIX_DIGITS,
};
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::scheduler::ScheduleConfig;

/// Environment variable that overrides `server.port`
pub const PORT_ENV: &str = "PORT";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub keys: KeyPolicyConfig,
    pub scheduler: SchedulerSettings,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where keys are persisted
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `sqlite` or `memory`
    pub backend: String,
    /// SQLite database file
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

/// Shape and lifetime of issued keys
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyPolicyConfig {
    pub prefix: String,
    pub suffix_digits: u32,
    pub ttl_secs: i64,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub enabled: bool,
    /// UTC time of day for the daily batch, `HH:MM` or `HH:MM:SS`
    pub daily_at: String,
    pub rotation_interval_secs: i64,
    pub poll_interval_ms: u64,
    pub sweep_before_issue: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        let sqlite = SqliteConfig::default();
        Self {
            backend: "sqlite".to_string(),
            path: sqlite.path,
            max_connections: sqlite.max_connections,
            busy_timeout_secs: sqlite.busy_timeout_secs,
        }
    }
}

impl Default for KeyPolicyConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            suffix_digits: DEFAULT_SUFFIX_DIGITS,
            ttl_secs: DEFAULT_TTL_SECS,
            batch_size: 100,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_at: "00:00".to_string(),
            rotation_interval_secs: 3_600,
            poll_interval_ms: 1_000,
            sweep_before_issue: true,
        }
    }
}

impl AppConfig {
    /// Load from config files, `APP__*` variables and `PORT`
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_port(std::env::var(PORT_ENV).ok().as_deref())
    }

    fn load_with_port(port: Option<&str>) -> Result<Self, config::ConfigError> {
        let port = port
            .map(|raw| {
                raw.trim().parse::<u16>().map_err(|e| {
                    config::ConfigError::Message(format!("invalid {} '{}': {}", PORT_ENV, raw, e))
                })
            })
            .transpose()?;

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", port.map(i64::from))?
            .build()?;

        config.try_deserialize()
    }

    /// Check every setting that the runtime would otherwise trip over later
    pub fn validate(&self) -> Result<(), DomainError> {
        self.storage_config()?;
        self.key_ttl()?;
        self.key_generator()?;
        self.schedule_config()?;
        Ok(())
    }

    pub fn storage_config(&self) -> Result<StorageConfig, DomainError> {
        let backend = StorageType::from_str(&self.storage.backend).ok_or_else(|| {
            DomainError::configuration(format!(
                "unknown storage backend '{}'",
                self.storage.backend
            ))
        })?;

        Ok(match backend {
            StorageType::InMemory => StorageConfig::in_memory(),
            StorageType::Sqlite => {
                if self.storage.max_connections == 0 {
                    return Err(DomainError::configuration(
                        "storage.max_connections must be positive",
                    ));
                }
                StorageConfig::sqlite(
                    SqliteConfig::new(&self.storage.path)
                        .with_max_connections(self.storage.max_connections)
                        .with_busy_timeout(self.storage.busy_timeout_secs),
                )
            }
        })
    }

    pub fn key_ttl(&self) -> Result<KeyTtl, DomainError> {
        KeyTtl::from_secs(self.keys.ttl_secs)
            .ok_or_else(|| DomainError::configuration("keys.ttl_secs must be positive"))
    }

    pub fn key_generator(&self) -> Result<RandomKeyGenerator, DomainError> {
        RandomKeyGenerator::new(&self.keys.prefix).with_suffix_digits(self.keys.suffix_digits)
    }

    pub fn schedule_config(&self) -> Result<ScheduleConfig, DomainError> {
        if self.keys.batch_size == 0 {
            return Err(DomainError::configuration("keys.batch_size must be positive"));
        }
        if self.scheduler.rotation_interval_secs <= 0 {
            return Err(DomainError::configuration(
                "scheduler.rotation_interval_secs must be positive",
            ));
        }
        if self.scheduler.poll_interval_ms == 0 {
            return Err(DomainError::configuration(
                "scheduler.poll_interval_ms must be positive",
            ));
        }

        Ok(ScheduleConfig {
            daily_at: parse_time_of_day(&self.scheduler.daily_at)?,
            rotation_interval_secs: self.scheduler.rotation_interval_secs,
            poll_interval: Duration::from_millis(self.scheduler.poll_interval_ms),
            batch_size: self.keys.batch_size,
            sweep_before_issue: self.scheduler.sweep_before_issue,
        })
    }
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| {
            DomainError::configuration(format!(
                "scheduler.daily_at must be HH:MM or HH:MM:SS, got '{}'",
                raw
            ))
        })
}
