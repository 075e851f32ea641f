//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, KeyPolicyConfig, LogFormat, LoggingConfig, SchedulerSettings, ServerConfig,
    StorageSettings, PORT_ENV,
};
