//! Key validation and listing endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::state::AppState;
use super::types::{ApiError, Json};
use crate::domain::KeyStatus;

const KEY_REQUIRED: &str = "Key is required";

/// Body of `POST /api/authenticate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthenticateRequest {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub status: AuthOutcome,
    pub message: String,
}

impl AuthenticateResponse {
    /// HTTP status and body for a validation outcome
    pub fn from_status(status: KeyStatus) -> (StatusCode, Self) {
        let (code, outcome, message) = match status {
            KeyStatus::Valid => (StatusCode::OK, AuthOutcome::Success, "Key is valid"),
            KeyStatus::Expired => (StatusCode::UNAUTHORIZED, AuthOutcome::Failed, "Key has expired"),
            KeyStatus::NotFound => (StatusCode::UNAUTHORIZED, AuthOutcome::Failed, "Invalid key"),
        };

        (
            code,
            Self {
                status: outcome,
                message: message.to_string(),
            },
        )
    }
}

/// Create the `/api` router
pub fn create_keys_router() -> Router<AppState> {
    Router::new()
        .route("/authenticate", post(authenticate))
        .route("/get_keys", get(get_keys))
        .route("/get_active_keys", get(get_active_keys))
}

/// POST /api/authenticate
pub async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<AuthenticateRequest>,
) -> Result<(StatusCode, Json<AuthenticateResponse>), ApiError> {
    let key = request
        .key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ApiError::bad_request(KEY_REQUIRED))?;

    let status = state.engine.validate(key, state.engine.now()).await?;
    debug!(status = %status, "Authentication attempt");

    let (code, body) = AuthenticateResponse::from_status(status);
    Ok((code, Json(body)))
}

/// GET /api/get_keys - every stored key, including expired ones not yet swept
pub async fn get_keys(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let keys = state.engine.list_active(state.engine.now()).await?;
    Ok(Json(keys))
}

/// GET /api/get_active_keys - only keys that would authenticate right now
pub async fn get_active_keys(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let keys = state.engine.list_valid(state.engine.now()).await?;
    Ok(Json(keys))
}
