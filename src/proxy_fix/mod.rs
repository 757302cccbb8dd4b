//! Reverse proxy fix middleware.
//!
//! # Data Flow
//! ```text
//! Request from proxy
//!     → forwarded.rs (pick trusted X-Forwarded-* values)
//!     → prefix.rs (strip the static mount prefix)
//!     → host.rs (split/replace host and port)
//!     → resolve.rs (build ForwardedInfo, rewrite Host/path/ConnectInfo)
//!     → layer.rs (tower Layer/Service around the application)
//!     → application handler (extracts ForwardedInfo)
//! ```
//!
//! Headers are only read for the number of hops configured for them; with
//! zero hops a header is ignored entirely.

pub mod forwarded;
pub mod host;
pub mod info;
pub mod layer;
pub mod prefix;
pub mod resolve;

pub use info::{ForwardedInfo, OriginalRequest};
pub use layer::{ProxyFixLayer, ProxyFixService, SharedProxyFix};
pub use resolve::{ProxyFix, Resolution};
