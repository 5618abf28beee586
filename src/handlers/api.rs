//! REST API handler.
//!
//! The application API proper lives behind this router; the gateway only
//! mounts its own liveness and status endpoints here.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;

use crate::security::rate_limit::RateLimiterConfig;

#[derive(Clone, Debug)]
pub struct ApiState {
    pub rate_limit: RateLimiterConfig,
    pub rate_limit_enabled: bool,
    pub serve_frontend: bool,
    pub started_at: Instant,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct RateLimitSummary {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_seconds: f64,
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub uptime_secs: u64,
    pub serve_frontend: bool,
    pub rate_limit: RateLimitSummary,
}

pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

pub async fn get_status(State(state): State<ApiState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        serve_frontend: state.serve_frontend,
        rate_limit: RateLimitSummary {
            enabled: state.rate_limit_enabled,
            max_requests: state.rate_limit.max_requests(),
            window_seconds: state.rate_limit.window().as_secs_f64(),
        },
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
}

/// API router mounted under `prefix`.
pub fn router(prefix: &str, state: ApiState) -> Router {
    let api = Router::new()
        .route("/health", get(get_health))
        .route("/status", get(get_status))
        .with_state(state);

    Router::new().nest(prefix, api).fallback(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(
            "/api",
            ApiState {
                rate_limit: RateLimiterConfig::new(10, 1.0).unwrap(),
                rate_limit_enabled: true,
                serve_frontend: true,
                started_at: Instant::now(),
            },
        )
    }

    async fn get_json(app: Router, path: &str) -> (StatusCode, serde_json::Value) {
        let res = app
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), 4096).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get_json(app(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_reports_rate_limit() {
        let (status, json) = get_json(app(), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rate_limit"]["max_requests"], 10);
        assert_eq!(json["rate_limit"]["window_seconds"], 1.0);
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unknown_paths_are_json_404() {
        for path in ["/api/conversations", "/index.html"] {
            let (status, json) = get_json(app(), path).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json["error"], "not_found");
        }
    }
}
