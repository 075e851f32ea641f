//! API middleware components

pub mod metrics;

pub use self::metrics::metrics_middleware;
