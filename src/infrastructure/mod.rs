//! Infrastructure layer - storage backends, key generation, scheduling
//! and observability

pub mod access_key;
pub mod logging;
pub mod observability;
pub mod scheduler;
