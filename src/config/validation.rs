//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Every problem is
//! collected so one run reports all of them.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::security::rate_limit::RateLimitError;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: prefix {value:?} must start with '/' and not be the root path")]
    InvalidPrefix { field: &'static str, value: String },

    #[error("routing: messaging and api prefixes must differ (both {0:?})")]
    PrefixConflict(String),

    #[error("rate_limit: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("frontend.index_file must not be empty")]
    EmptyIndexFile,
}

fn check_prefix(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if !value.starts_with('/') || value == "/" {
        errors.push(ValidationError::InvalidPrefix {
            field,
            value: value.to_string(),
        });
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    check_prefix("routing.messaging_prefix", &config.routing.messaging_prefix, &mut errors);
    check_prefix("routing.api_prefix", &config.routing.api_prefix, &mut errors);
    if config.routing.messaging_prefix == config.routing.api_prefix {
        errors.push(ValidationError::PrefixConflict(
            config.routing.api_prefix.clone(),
        ));
    }

    for prefix in &config.rate_limit.exempt_path_prefixes {
        check_prefix("rate_limit.exempt_path_prefixes", prefix, &mut errors);
    }
    for prefix in &config.cache_control.immutable_path_prefixes {
        check_prefix("cache_control.immutable_path_prefixes", prefix, &mut errors);
    }

    if let Err(e) = config.rate_limit.limiter_config() {
        errors.push(e.into());
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.frontend.index_file.trim().is_empty() {
        errors.push(ValidationError::EmptyIndexFile);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
