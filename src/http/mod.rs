//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID)
//!     → middleware/rate_limit.rs (admission control)
//!     → middleware/cache_control.rs + CORS (response policies)
//!     → server.rs dispatch (routing decides destination)
//!     → messaging / api / static handler
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
