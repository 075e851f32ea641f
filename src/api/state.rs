//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::access_key::LifecycleEngine;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
}

impl AppState {
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self { engine }
    }
}
