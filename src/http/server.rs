//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the echo and version handlers
//! - Wire up middleware (request id, tracing, timeout)
//! - Wrap the router in the proxy fix so routing sees the fixed path
//! - Apply `[proxy_fix]` changes from config reloads
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    http::Request as HttpRequest,
    routing::get,
    Router, ServiceExt,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::Layer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::ProxyConfig;
use crate::http::handlers::{self, VERSION_PATH};
use crate::http::request::{request_id, UuidRequestId};
use crate::proxy_fix::layer::{self, ProxyFixLayer, ProxyFixService, SharedProxyFix};

/// HTTP server for the proxy fix demo application.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    proxy_fix: SharedProxyFix,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let proxy_fix = layer::shared(&config.proxy_fix);
        let router = Self::build_router(&config);
        Self {
            router,
            config,
            proxy_fix,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig) -> Router {
        Router::new()
            .route(VERSION_PATH, get(handlers::version))
            .fallback(handlers::echo)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The complete application: router behind the proxy fix.
    pub fn app(&self) -> ProxyFixService<Router> {
        ProxyFixLayer::shared(self.proxy_fix.clone()).layer(self.router.clone())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the proxy fix
    /// settings; other sections need a restart.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let handle = self.proxy_fix.clone();
        let current = self.config.clone();
        tokio::spawn(async move {
            let mut current = current;
            while let Some(new_config) = config_updates.recv().await {
                if new_config.proxy_fix != current.proxy_fix {
                    layer::reload(&handle, &new_config.proxy_fix);
                }
                if new_config.listener != current.listener || new_config.timeouts != current.timeouts {
                    tracing::warn!("Listener and timeout changes take effect after a restart");
                }
                current = new_config;
            }
        });

        let app = self.app();
        let service = ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app);

        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn make_span(request: &HttpRequest<Body>) -> Span {
    let id = request_id(request.headers()).unwrap_or_default();
    tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        uri = %request.uri(),
    )
}
