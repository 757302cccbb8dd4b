//! Middleware for applications running under a reverse proxy.
//!
//! [`ProxyFixLayer`] rebuilds the client-facing request (client address,
//! scheme, host, port, mount prefix) from `X-Forwarded-*` headers, trusting
//! only the configured number of proxy hops, and strips a static mount
//! prefix from the request path. Handlers read the result through the
//! [`ForwardedInfo`] extractor.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy_fix;
pub mod version;

pub use config::schema::{ProxyConfig, ProxyFixConfig, TrustedHops};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy_fix::{ForwardedInfo, OriginalRequest, ProxyFix, ProxyFixLayer, ProxyFixService};
