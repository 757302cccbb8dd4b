//! Proxy fix demonstration server.
//!
//! Answers every request with a JSON description of how it was resolved
//! behind the reverse proxy. Point the proxy at it to check which headers
//! arrive and what the application will make of them.
//!
//! ```text
//!   client ──▶ reverse proxy ──▶ reverse-proxy-fix
//!                                   │
//!                                   ├─ ProxyFixLayer   X-Forwarded-*, mount prefix
//!                                   ├─ request id      x-request-id (UUID v4)
//!                                   ├─ trace/timeout
//!                                   └─ echo handler    JSON resolution report
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use reverse_proxy_fix::config::loader::{default_config, load_config};
use reverse_proxy_fix::config::watcher::ConfigWatcher;
use reverse_proxy_fix::observability::{logging, metrics};
use reverse_proxy_fix::version;
use reverse_proxy_fix::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "reverse-proxy-fix")]
#[command(version = version::build_version())]
#[command(about = "Echo server showing how requests resolve behind a reverse proxy", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "PROXY_FIX_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload `[proxy_fix]` settings when the config file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!(version = version::build_version(), "reverse-proxy-fix starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        x_for = config.proxy_fix.hops.x_for,
        x_proto = config.proxy_fix.hops.x_proto,
        x_host = config.proxy_fix.hops.x_host,
        x_port = config.proxy_fix.hops.x_port,
        x_prefix = config.proxy_fix.hops.x_prefix,
        prefix = ?config.proxy_fix.prefix,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
