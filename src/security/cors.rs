//! Cross-origin policy.
//!
//! Local development origins (`localhost`, `127.0.0.1`, `[::1]`, any scheme
//! and port) are always allowed. Anything else must appear verbatim in the
//! configured permitted list.

use axum::http::{request::Parts, HeaderValue};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

/// Allow/deny predicate for an `Origin` header value.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    permitted: Vec<String>,
}

impl OriginPolicy {
    pub fn new(permitted: &[String]) -> Self {
        Self {
            permitted: permitted
                .iter()
                .map(|origin| origin.trim_end_matches('/').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/').to_ascii_lowercase();
        is_local_origin(&origin) || self.permitted.iter().any(|p| *p == origin)
    }
}

fn is_local_origin(origin: &str) -> bool {
    let Some((scheme, rest)) = origin.split_once("://") else {
        return false;
    };
    if scheme != "http" && scheme != "https" {
        return false;
    }

    let host = if rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => &rest[..=end],
            None => return false,
        }
    } else {
        rest.split([':', '/']).next().unwrap_or_default()
    };
    LOCAL_HOSTS.contains(&host)
}

/// Build the CORS layer for the configured policy.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let policy = Arc::new(OriginPolicy::new(&config.permitted_origins));
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| policy.is_allowed(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
