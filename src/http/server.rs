//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Build the middleware stack (tracing, request ID, timeout, rate limit,
//!   cache-control, CORS)
//! - Classify each request and forward it unmodified to one destination
//! - Serve with a connection cap and graceful shutdown
//!
//! # Layer order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → Timeout
//!     → RateLimit → CacheControl → Cors → dispatch
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    serve::ListenerExt,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::handlers::Handlers;
use crate::http::middleware::{cache_control_middleware, rate_limit_middleware, RateLimitState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::net::BoundedListener;
use crate::observability::metrics;
use crate::routing::{ConnectionRouter, ConnectionScope, Destination};
use crate::security::cache_control::CachePolicy;
use crate::security::cors::cors_layer;
use crate::security::rate_limit::{RateLimitError, RateLimiter};

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConnectionRouter>,
    pub handlers: Handlers,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    limiter: Arc<RateLimiter>,
}

impl GatewayServer {
    /// Create a server with a system-clock limiter.
    pub fn new(config: GatewayConfig, handlers: Handlers) -> Result<Self, RateLimitError> {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.limiter_config()?));
        Ok(Self::with_limiter(config, handlers, limiter))
    }

    /// Create a server around an existing limiter.
    pub fn with_limiter(
        config: GatewayConfig,
        handlers: Handlers,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let serve_frontend = config.routing.serve_frontend && handlers.static_files.is_some();
        let connection_router = ConnectionRouter::new(
            &config.routing.messaging_prefix,
            &config.routing.api_prefix,
            serve_frontend,
        );

        let state = AppState {
            router: Arc::new(connection_router),
            handlers,
        };

        let router = Self::build_router(&config, state, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState, limiter: Arc<RateLimiter>) -> Router {
        let rate_limit = RateLimitState::new(limiter, &config.rate_limit);
        let cache_policy = Arc::new(CachePolicy::new(&config.cache_control));

        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(cors_layer(&config.cors))
            .layer(middleware::from_fn_with_state(cache_policy, cache_control_middleware))
            .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires. At most
    /// `listener.max_connections` connections are open at once.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let max_connections = self.config.listener.max_connections;
        tracing::info!(
            address = %addr,
            max_connections,
            serve_frontend = self.config.routing.serve_frontend,
            max_requests = self.limiter.config().max_requests(),
            window_secs = self.limiter.config().window().as_secs_f64(),
            "HTTP server starting"
        );

        let listener = BoundedListener::new(listener, max_connections).tap_io(|stream| {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::trace!(error = %e, "Failed to set TCP_NODELAY");
            }
        });
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Classify the request and hand it, unmodified, to one destination.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();

    let scope = match ConnectionScope::from_request(&request) {
        Ok(scope) => scope,
        Err(e) => {
            tracing::debug!(request_id = %request.request_id(), error = %e, "Rejecting request");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "unroutable_request" })),
            )
                .into_response();
        }
    };

    let destination = state.router.route(&scope);
    tracing::debug!(
        request_id = %request.request_id(),
        protocol = %scope.protocol,
        path = %scope.path,
        destination = destination.as_str(),
        "Dispatching request"
    );

    let handler = match destination {
        Destination::Messaging => state.handlers.messaging,
        Destination::Api => state.handlers.api,
        Destination::StaticFiles => match state.handlers.static_files {
            Some(static_files) => static_files,
            None => state.handlers.api,
        },
    };

    let response = match handler.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    metrics::record_request(destination.as_str(), response.status().as_u16(), start_time);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;
    use crate::security::rate_limit::RateLimiterConfig;
    use axum::http::header;

    fn marker(name: &'static str) -> Router {
        Router::new().fallback(move || async move { name })
    }

    fn handlers() -> Handlers {
        Handlers::new(marker("messaging"), marker("api")).with_static_files(marker("static"))
    }

    fn server(config: GatewayConfig, handlers: Handlers) -> (GatewayServer, ManualClock) {
        let clock = ManualClock::new();
        let limiter = Arc::new(RateLimiter::with_clock(
            config.rate_limit.limiter_config().unwrap(),
            Arc::new(clock.clone()),
        ));
        (GatewayServer::with_limiter(config, handlers, limiter), clock)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let res = app.oneshot(request).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), 4096).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(path: &str) -> Request<Body> {
        Request::get(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_table() {
        let (server, _clock) = server(GatewayConfig::default(), handlers());
        let app = server.router();

        assert_eq!(send(app.clone(), get("/api/conversations")).await.1, "api");
        assert_eq!(send(app.clone(), get("/index.html")).await.1, "static");
        assert_eq!(send(app.clone(), get("/realtime/")).await.1, "messaging");

        let upgrade = Request::get("/realtime")
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(app.clone(), upgrade).await.1, "messaging");

        let unknown = Request::get("/api/conversations")
            .header(header::UPGRADE, "h2c")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(app, unknown).await.1, "messaging");
    }

    #[tokio::test]
    async fn test_frontend_disabled_routes_to_api() {
        let mut config = GatewayConfig::default();
        config.routing.serve_frontend = false;
        let (server, _clock) = server(config, handlers());

        assert_eq!(send(server.router(), get("/index.html")).await.1, "api");
    }

    #[tokio::test]
    async fn test_missing_static_handler_routes_to_api() {
        let (server, _clock) = server(
            GatewayConfig::default(),
            Handlers::new(marker("messaging"), marker("api")),
        );
        assert_eq!(send(server.router(), get("/index.html")).await.1, "api");
    }

    #[tokio::test]
    async fn test_unroutable_target_is_bad_request() {
        let (server, _clock) = server(GatewayConfig::default(), handlers());
        let req = Request::connect("example.com:443").body(Body::empty()).unwrap();

        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("unroutable_request"));
    }

    #[tokio::test]
    async fn test_rate_limit_applies_before_dispatch() {
        let mut config = GatewayConfig::default();
        config.rate_limit.max_requests = 2;
        let (server, clock) = server(config, handlers());
        let app = server.router();

        assert_eq!(send(app.clone(), get("/api/a")).await.0, StatusCode::OK);
        assert_eq!(send(app.clone(), get("/b")).await.0, StatusCode::OK);

        let res = app.clone().oneshot(get("/api/c")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key(header::RETRY_AFTER));

        clock.advance(Duration::from_secs(1));
        assert_eq!(send(app, get("/api/d")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_response_policies_applied() {
        let (server, _clock) = server(GatewayConfig::default(), handlers());
        let req = Request::get("/assets/app.js")
            .header(header::ORIGIN, "http://localhost:3001")
            .body(Body::empty())
            .unwrap();

        let res = server.router().oneshot(req).await.unwrap();
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3001"
        );
        assert_eq!(
            res.headers()[header::CACHE_CONTROL],
            "public, max-age=2592000, immutable"
        );
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_foreign_origin_gets_no_cors_grant() {
        let (server, _clock) = server(GatewayConfig::default(), handlers());
        let req = Request::get("/api/x")
            .header(header::ORIGIN, "https://evil.example.com")
            .body(Body::empty())
            .unwrap();

        let res = server.router().oneshot(req).await.unwrap();
        assert!(res
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_times_out_with_408() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 1;
        let slow = Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        });
        let (server, _clock) = server(config, Handlers::new(marker("messaging"), slow));

        let (status, _) = send(server.router(), get("/api/slow")).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_rejects_invalid_limiter_config() {
        let mut config = GatewayConfig::default();
        config.rate_limit.window_seconds = -1.0;
        assert!(matches!(
            GatewayServer::new(config, handlers()),
            Err(RateLimitError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_limiter_config_is_wired() {
        let mut config = GatewayConfig::default();
        config.rate_limit.max_requests = 7;
        config.rate_limit.window_seconds = 2.0;
        let server = GatewayServer::new(config, handlers()).unwrap();
        assert_eq!(
            *server.limiter().config(),
            RateLimiterConfig::new(7, 2.0).unwrap()
        );
    }
}
