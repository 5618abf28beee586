//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_SERVE_FRONTEND: &str = "SERVE_FRONTEND";
pub const ENV_RATE_LIMIT_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const ENV_RATE_LIMIT_WINDOW_SECONDS: &str = "RATE_LIMIT_WINDOW_SECONDS";
pub const ENV_PERMITTED_CORS_ORIGINS: &str = "PERMITTED_CORS_ORIGINS";
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Apply environment overrides on top of file/default values.
///
/// `lookup` abstracts over the process environment so overrides can be
/// tested without touching global state.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_SERVE_FRONTEND) {
        config.routing.serve_frontend = value.trim().eq_ignore_ascii_case("true");
    }

    if let Some(value) = lookup(ENV_RATE_LIMIT_MAX_REQUESTS) {
        config.rate_limit.max_requests =
            value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_RATE_LIMIT_MAX_REQUESTS,
                value: value.clone(),
            })?;
    }

    if let Some(value) = lookup(ENV_RATE_LIMIT_WINDOW_SECONDS) {
        config.rate_limit.window_seconds =
            value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_RATE_LIMIT_WINDOW_SECONDS,
                value: value.clone(),
            })?;
    }

    if let Some(value) = lookup(ENV_PERMITTED_CORS_ORIGINS) {
        config.cors.permitted_origins = value
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Some(value) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = value.trim().to_string();
    }

    Ok(())
}

/// Parse a TOML document, apply overrides, and validate.
pub fn load_config_from_str<F>(content: &str, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load configuration from an optional TOML file plus the process environment.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let content = match path {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    load_config_from_str(&content, |var| std::env::var(var).ok())
}
