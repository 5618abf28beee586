//! Destination handlers.
//!
//! The gateway treats each destination as an opaque `axum::Router`. Any
//! router can be injected; `Handlers::from_config` builds the defaults:
//!
//! ```text
//! Messaging   → messaging.rs (WebSocket fan-out hub)
//! Api         → api.rs (health/status, JSON 404 otherwise)
//! StaticFiles → spa.rs (build directory with index fallback)
//! ```

pub mod api;
pub mod messaging;
pub mod spa;

use axum::Router;
use std::time::Instant;

use crate::config::GatewayConfig;
use crate::security::rate_limit::RateLimitError;

/// The three dispatch targets.
#[derive(Clone, Debug)]
pub struct Handlers {
    pub messaging: Router,
    pub api: Router,
    /// `None` when the frontend is not mounted.
    pub static_files: Option<Router>,
}

impl Handlers {
    pub fn new(messaging: Router, api: Router) -> Self {
        Self {
            messaging,
            api,
            static_files: None,
        }
    }

    pub fn with_static_files(mut self, static_files: Router) -> Self {
        self.static_files = Some(static_files);
        self
    }

    /// Default collaborators for a configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RateLimitError> {
        let api_state = api::ApiState {
            rate_limit: config.rate_limit.limiter_config()?,
            rate_limit_enabled: config.rate_limit.enabled,
            serve_frontend: config.routing.serve_frontend,
            started_at: Instant::now(),
        };

        let handlers = Self::new(
            messaging::router(messaging::MessagingHub::new()),
            api::router(&config.routing.api_prefix, api_state),
        );

        Ok(if config.routing.serve_frontend {
            handlers.with_static_files(spa::router(&config.frontend))
        } else {
            handlers
        })
    }
}
