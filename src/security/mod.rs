//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_key.rs (derive the caller's bucket)
//!     → rate_limit.rs (fixed-window admission check)
//!     → cache_control.rs (response caching policy)
//!     → cors.rs (origin allow/deny)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Limiter state is owned by an injectable `RateLimiter`, never a global
//! - Time comes from an injectable `Clock`
//! - Rejections are explicit 429s with retry guidance

pub mod cache_control;
pub mod client_key;
pub mod clock;
pub mod cors;
pub mod rate_limit;

pub use client_key::{ClientKey, ClientKeyExtractor, Principal};
pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limit::{Decision, RateLimitError, RateLimiter, RateLimiterConfig};
