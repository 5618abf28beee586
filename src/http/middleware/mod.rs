//! Request middleware applied in front of dispatch.

pub mod cache_control;
pub mod rate_limit;

pub use cache_control::cache_control_middleware;
pub use rate_limit::{rate_limit_middleware, rate_limited_response, RateLimitState};
