//! HTTP server subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → ProxyFixLayer (rewrite Host, path, client address)
//!     → server.rs (Axum router, request id, tracing, timeout)
//!     → handlers.rs (echo / version)
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
