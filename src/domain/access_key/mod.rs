//! Access key domain module
//!
//! Access keys are opaque bearer tokens that stay valid for a fixed TTL
//! after issuance and are then swept from the store.

mod entity;
mod repository;

pub use entity::{KeyStatus, KeyTtl, DEFAULT_TTL_SECS};
pub use repository::KeyStore;

#[cfg(test)]
pub use repository::mock;
