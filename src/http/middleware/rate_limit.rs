//! Rate limiting middleware.
//!
//! Every request (except exempt paths) is checked before any handler runs.
//! A denied request gets a terminal 429 with `Retry-After`; the wrapped
//! handler is never invoked.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client_key::ClientKeyExtractor;
use crate::security::rate_limit::{Decision, RateLimiter};

/// State shared by every invocation of [`rate_limit_middleware`].
#[derive(Clone, Debug)]
pub struct RateLimitState {
    limiter: Arc<RateLimiter>,
    extractor: ClientKeyExtractor,
    exempt_prefixes: Arc<[String]>,
    enabled: bool,
}

impl RateLimitState {
    pub fn new(limiter: Arc<RateLimiter>, config: &RateLimitConfig) -> Self {
        Self {
            limiter,
            extractor: ClientKeyExtractor::new(config.trust_forwarded_for),
            exempt_prefixes: config.exempt_path_prefixes.clone().into(),
            enabled: config.enabled,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    fn applies_to(&self, path: &str) -> bool {
        self.enabled
            && !self
                .exempt_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// The 429 returned to a rejected client.
pub fn rate_limited_response(decision: &Decision) -> Response {
    let retry_after = decision.retry_after_secs();
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after.to_string())],
        Json(json!({
            "error": "rate_limit_exceeded",
            "retry_after": retry_after,
        })),
    )
        .into_response()
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let key = state.extractor.extract(&request);
    let decision = state.limiter.check_now(&key);

    if decision.allowed {
        next.run(request).await
    } else {
        tracing::debug!(
            client = %key,
            path = %request.uri().path(),
            retry_after_ms = decision.retry_after.as_millis() as u64,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited("window_quota");
        rate_limited_response(&decision)
    }
}
