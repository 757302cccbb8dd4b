//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, REVERSE_PROXY_PATH override)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → server swaps the shared ProxyFix settings
//! ```
//!
//! Listener and timeout changes need a restart; only `[proxy_fix]` is
//! applied live.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, ProxyFixConfig, TimeoutConfig,
    TrustedHops,
};
pub use validation::ValidationError;
