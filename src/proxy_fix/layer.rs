//! Tower middleware applying [`ProxyFix`] to every request.
//!
//! Routing happens inside an axum `Router`, so to make prefix stripping
//! affect which route matches, wrap the whole router rather than adding the
//! layer with `Router::layer`:
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use reverse_proxy_fix::{ProxyFixConfig, ProxyFixLayer};
//! use tower::Layer;
//!
//! let router: Router = Router::new().route("/", get(|| async { "ok" }));
//! let app = ProxyFixLayer::new(&ProxyFixConfig::default()).layer(router);
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use axum::http::Request;
use tower::{Layer, Service};

use crate::config::ProxyFixConfig;
use crate::proxy_fix::resolve::ProxyFix;

/// Settings shared between the middleware and whoever reloads them.
pub type SharedProxyFix = Arc<ArcSwap<ProxyFix>>;

/// Create shared settings from a configuration.
pub fn shared(config: &ProxyFixConfig) -> SharedProxyFix {
    Arc::new(ArcSwap::from_pointee(ProxyFix::new(config)))
}

/// Replace the settings seen by every service built from the same handle.
pub fn reload(handle: &SharedProxyFix, config: &ProxyFixConfig) {
    let fix = ProxyFix::new(config);
    tracing::info!(
        x_for = fix.hops().x_for,
        x_proto = fix.hops().x_proto,
        x_host = fix.hops().x_host,
        x_port = fix.hops().x_port,
        x_prefix = fix.hops().x_prefix,
        prefix = ?fix.prefix(),
        "Proxy fix settings updated"
    );
    handle.store(Arc::new(fix));
}

#[derive(Clone)]
pub struct ProxyFixLayer {
    fix: SharedProxyFix,
}

impl ProxyFixLayer {
    /// Layer with fixed settings.
    pub fn new(config: &ProxyFixConfig) -> Self {
        Self { fix: shared(config) }
    }

    /// Layer reading settings from a reloadable handle.
    pub fn shared(fix: SharedProxyFix) -> Self {
        Self { fix }
    }
}

impl<S> Layer<S> for ProxyFixLayer {
    type Service = ProxyFixService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProxyFixService {
            inner,
            fix: self.fix.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ProxyFixService<S> {
    inner: S,
    fix: SharedProxyFix,
}

impl<S, B> Service<Request<B>> for ProxyFixService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        self.fix.load().apply(&mut req);
        self.inner.call(req)
    }
}
