//! Cache-Control response stamping.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::security::cache_control::CachePolicy;

pub async fn cache_control_middleware(
    State(policy): State<Arc<CachePolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let cache = policy.headers_for(request.uri().path());
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, cache.cache_control);
    if cache.legacy_no_cache {
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    }
    response
}
