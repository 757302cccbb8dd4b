//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, so editors
//! and deploy tools that replace the file by renaming a new one over it are
//! picked up. Events for other files in the directory are ignored.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxyConfig;
use crate::observability::metrics;

/// Watches the configuration file and sends every valid, changed version.
///
/// Invalid edits are logged and dropped; the running configuration stays.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

/// Per-watch state living inside the notify callback.
struct ReloadState {
    path: PathBuf,
    file_name: Option<OsString>,
    last_sent: Option<ProxyConfig>,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ReloadState {
    fn concerns_config(&self, event: &Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name().map(OsString::from) == self.file_name)
    }

    fn handle(&mut self, event: Event) {
        if !self.concerns_config(&event) {
            return;
        }

        match load_config(&self.path) {
            Ok(config) if self.last_sent.as_ref() == Some(&config) => {
                tracing::trace!(path = ?self.path, "Config file touched without changes");
            }
            Ok(config) => {
                metrics::record_config_reload(true);
                tracing::info!(path = ?self.path, "Config file reloaded");
                self.last_sent = Some(config.clone());
                let _ = self.update_tx.send(config);
            }
            Err(error) => {
                metrics::record_config_reload(false);
                tracing::error!(
                    path = ?self.path,
                    error = %error,
                    "Config reload rejected, keeping current configuration"
                );
            }
        }
    }
}

impl ConfigWatcher {
    /// Create a watcher and the receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    ///
    /// The file's current contents are the baseline: an event that leaves the
    /// configuration unchanged sends nothing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let baseline = match load_config(&self.path) {
            Ok(config) => Some(config),
            Err(ConfigError::Io(error)) => {
                tracing::warn!(path = ?self.path, error = %error, "Config file not readable yet");
                None
            }
            Err(error) => {
                tracing::warn!(path = ?self.path, error = %error, "Current config file is invalid");
                None
            }
        };

        let mut state = ReloadState {
            file_name: self.path.file_name().map(OsString::from),
            path: self.path.clone(),
            last_sent: baseline,
            update_tx: self.update_tx,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => state.handle(event),
                Err(error) => tracing::error!(error = ?error, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, directory = ?directory, "Config watcher started");
        Ok(watcher)
    }
}
