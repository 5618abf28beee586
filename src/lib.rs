//! Realtime gateway library.
//!
//! A request router that sends each connection to a messaging, API, or
//! static-frontend handler, behind per-client rate limiting and fixed
//! CORS and cache-control policies.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use handlers::Handlers;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
