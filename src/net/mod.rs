//! Network layer.
//!
//! # Data Flow
//! ```text
//! TcpListener → BoundedListener (max_connections) → axum::serve
//! ```

pub mod listener;

pub use listener::{BoundedListener, LimitedStream};
