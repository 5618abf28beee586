//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::security::rate_limit::{RateLimitError, RateLimiterConfig};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Dispatch prefixes and frontend toggle.
    pub routing: RoutingConfig,

    /// Static single-page application settings.
    pub frontend: FrontendConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Cache-Control policy.
    pub cache_control: CacheControlConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Dispatch table configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Path prefix owned by the messaging handler.
    pub messaging_prefix: String,

    /// Path prefix owned by the API handler.
    pub api_prefix: String,

    /// Mount the static file handler. When false, traffic that would have
    /// reached it falls through to the API handler.
    pub serve_frontend: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            messaging_prefix: "/realtime".to_string(),
            api_prefix: "/api".to_string(),
            serve_frontend: true,
        }
    }
}

/// Static frontend configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FrontendConfig {
    /// Directory holding the built frontend.
    pub directory: PathBuf,

    /// File served for unknown paths (client-side routing).
    pub index_file: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./frontend/build"),
            index_file: "index.html".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per window per client. Signed so that negative
    /// values surface as validation errors rather than parse errors.
    pub max_requests: i64,

    /// Window length in seconds.
    pub window_seconds: f64,

    /// Paths under these prefixes are never limited.
    pub exempt_path_prefixes: Vec<String>,

    /// Take the client address from `X-Forwarded-For`.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    /// Validated limiter settings.
    pub fn limiter_config(&self) -> Result<RateLimiterConfig, RateLimitError> {
        RateLimiterConfig::from_signed(self.max_requests, self.window_seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_seconds: 1.0,
            exempt_path_prefixes: vec!["/assets".to_string()],
            trust_forwarded_for: false,
        }
    }
}

/// Cross-origin configuration. Localhost origins are always permitted.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Additional exact origins (e.g., "https://app.example.com").
    pub permitted_origins: Vec<String>,
}

/// Cache-Control configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheControlConfig {
    /// Paths under these prefixes hold content-hashed assets.
    pub immutable_path_prefixes: Vec<String>,

    /// max-age for immutable assets, in seconds.
    pub immutable_max_age_secs: u64,
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            immutable_path_prefixes: vec!["/assets".to_string()],
            immutable_max_age_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
