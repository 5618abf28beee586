//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (headers, path)
//!     → scope.rs (protocol + path, reject unroutable targets)
//!     → router.rs (dispatch table lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: Destination
//! ```
//!
//! # Design Decisions
//! - Table compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same destination
//! - First match wins, explicit fallback last

pub mod matcher;
pub mod router;
pub mod scope;

pub use router::{ConnectionRouter, Destination};
pub use scope::{ConnectionScope, Protocol, ScopeError};
