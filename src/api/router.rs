use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::health;
use super::keys;
use super::middleware::metrics_middleware;
use super::state::AppState;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        .route("/ready", get(health::ready_check))
        // Key endpoints
        .nest("/api", keys::create_keys_router())
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create the router plus the Prometheus scrape endpoint when enabled
pub fn create_router_with_metrics(
    state: AppState,
    metrics: Option<PrometheusMetrics>,
    metrics_path: &str,
) -> Router {
    let router = create_router(state);

    match metrics {
        Some(metrics) => router.merge(create_metrics_router(metrics, metrics_path)),
        None => router,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::access_key::mock::MockKeyStore;
    use crate::domain::{KeyStore, ManualClock, DEFAULT_TTL_SECS};
    use crate::infrastructure::access_key::{FixedKeyGenerator, InMemoryKeyStore, LifecycleEngine};

    const T0: i64 = 1_700_000_000;

    fn app_with(store: Arc<dyn KeyStore>) -> Router {
        let engine = LifecycleEngine::new(store)
            .with_clock(Arc::new(ManualClock::new(T0)))
            .with_generator(Arc::new(FixedKeyGenerator::new("B-Team_123456")));

        create_router(AppState::new(Arc::new(engine)))
    }

    fn seeded_app() -> Router {
        app_with(Arc::new(InMemoryKeyStore::with_keys([
            ("B-Team_111111", T0 - 60),
            ("B-Team_222222", T0 - DEFAULT_TTL_SECS - 1),
        ])))
    }

    fn authenticate_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/authenticate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_valid_key() {
        let response = seeded_app()
            .oneshot(authenticate_request(r#"{"key": "B-Team_111111"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "success", "message": "Key is valid"})
        );
    }

    #[tokio::test]
    async fn test_authenticate_expired_key() {
        let response = seeded_app()
            .oneshot(authenticate_request(r#"{"key": "B-Team_222222"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({"status": "failed", "message": "Key has expired"})
        );
    }

    #[tokio::test]
    async fn test_authenticate_unknown_key() {
        let response = seeded_app()
            .oneshot(authenticate_request(r#"{"key": "B-Team_999999"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({"status": "failed", "message": "Invalid key"})
        );
    }

    #[tokio::test]
    async fn test_authenticate_missing_key() {
        for body in [r#"{}"#, r#"{"key": null}"#, r#"{"key": ""}"#] {
            let response = seeded_app()
                .oneshot(authenticate_request(body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
            assert_eq!(json_body(response).await, json!({"error": "Key is required"}));
        }
    }

    #[tokio::test]
    async fn test_authenticate_malformed_json() {
        let response = seeded_app()
            .oneshot(authenticate_request(r#"{"key": "#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON syntax"));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_body_shape() {
        for body in [r#"{"key": 123}"#, "[1]", r#""x""#] {
            let response = seeded_app()
                .oneshot(authenticate_request(body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
            let body = json_body(response).await;
            assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON data"));
        }
    }

    #[tokio::test]
    async fn test_authenticate_without_content_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/authenticate")
            .body(Body::from(r#"{"key": "B-Team_111111"}"#))
            .unwrap();

        let response = seeded_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_get_keys_lists_everything_stored() {
        let response = seeded_app().oneshot(get_request("/api/get_keys")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let mut keys: Vec<String> = serde_json::from_value(json_body(response).await).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["B-Team_111111", "B-Team_222222"]);
    }

    #[tokio::test]
    async fn test_get_active_keys_filters_expired() {
        let response = seeded_app()
            .oneshot(get_request("/api/get_active_keys"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!(["B-Team_111111"]));
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let store = Arc::new(MockKeyStore::new());
        store.set_should_fail(true).await;
        let app = app_with(store);

        let response = app
            .clone()
            .oneshot(authenticate_request(r#"{"key": "B-Team_111111"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Internal server error"})
        );

        let response = app.oneshot(get_request("/api/get_keys")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let response = seeded_app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");

        let response = seeded_app().oneshot(get_request("/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = seeded_app().oneshot(get_request("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["checks"][0]["name"], "key_store");
        assert_eq!(body["checks"][0]["message"], "2 keys stored");
    }

    #[tokio::test]
    async fn test_ready_reports_unavailable_store() {
        let store = Arc::new(MockKeyStore::new());
        store.set_should_fail(true).await;

        let response = app_with(store).oneshot(get_request("/ready")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .uri("/api/get_keys")
            .header(header::ORIGIN, "https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = seeded_app().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_issued_key_authenticates_end_to_end() {
        let store = Arc::new(InMemoryKeyStore::new());
        let engine = Arc::new(
            LifecycleEngine::new(store)
                .with_clock(Arc::new(ManualClock::new(T0)))
                .with_generator(Arc::new(FixedKeyGenerator::new("B-Team_123456"))),
        );
        engine.issue_batch(1).await.unwrap();

        let response = create_router(AppState::new(engine))
            .oneshot(authenticate_request(r#"{"key": "B-Team_123456"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
