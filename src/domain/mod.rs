//! Domain layer - core types, rules and storage traits

pub mod access_key;
pub mod clock;
pub mod error;

pub use access_key::{KeyStatus, KeyStore, KeyTtl, DEFAULT_TTL_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
