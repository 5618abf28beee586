//! Cache-Control policy.
//!
//! Content-hashed assets are cacheable forever; everything else (the SPA
//! shell, API responses) must be revalidated on every load.

use axum::http::HeaderValue;

use crate::config::CacheControlConfig;

const NO_STORE: &str = "no-cache, no-store, must-revalidate, max-age=0";

/// Headers to stamp on a response, chosen by request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    pub cache_control: HeaderValue,
    /// `Pragma` and `Expires` for HTTP/1.0 caches; only set when not cacheable.
    pub legacy_no_cache: bool,
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    immutable_prefixes: Vec<String>,
    immutable: HeaderValue,
}

impl CachePolicy {
    pub fn new(config: &CacheControlConfig) -> Self {
        let immutable = HeaderValue::from_str(&format!(
            "public, max-age={}, immutable",
            config.immutable_max_age_secs
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("public, immutable"));

        Self {
            immutable_prefixes: config.immutable_path_prefixes.clone(),
            immutable,
        }
    }

    pub fn headers_for(&self, path: &str) -> CacheHeaders {
        if self
            .immutable_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            CacheHeaders {
                cache_control: self.immutable.clone(),
                legacy_no_cache: false,
            }
        } else {
            CacheHeaders {
                cache_control: HeaderValue::from_static(NO_STORE),
                legacy_no_cache: true,
            }
        }
    }
}
