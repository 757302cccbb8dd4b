//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that sets the mount prefix.
pub const REVERSE_PROXY_PATH: &str = "REVERSE_PROXY_PATH";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let mut config: ProxyConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Defaults plus environment overrides, for running without a file.
pub fn default_config() -> Result<ProxyConfig, ConfigError> {
    parse_config("")
}

/// Apply environment overrides using `lookup` to read variables.
///
/// An empty `REVERSE_PROXY_PATH` clears a prefix set in the file.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(prefix) = lookup(REVERSE_PROXY_PATH) {
        tracing::debug!(prefix = %prefix, "Mount prefix taken from {}", REVERSE_PROXY_PATH);
        config.proxy_fix.prefix = if prefix.is_empty() { None } else { Some(prefix) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_override_sets_and_clears_prefix() {
        let mut config = ProxyConfig::default();
        apply_env_overrides(&mut config, |k| (k == REVERSE_PROXY_PATH).then(|| "/app".to_string()));
        assert_eq!(config.proxy_fix.prefix.as_deref(), Some("/app"));

        apply_env_overrides(&mut config, |_| Some(String::new()));
        assert_eq!(config.proxy_fix.prefix, None);

        config.proxy_fix.prefix = Some("/kept".into());
        apply_env_overrides(&mut config, |_| None);
        assert_eq!(config.proxy_fix.prefix.as_deref(), Some("/kept"));
    }

    #[test]
    fn loads_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[listener]
bind_address = "127.0.0.1:9000"

[proxy_fix]
x_host = 1
x_port = 1
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.proxy_fix.hops.x_for, 1);
        assert_eq!(config.proxy_fix.hops.x_host, 1);
        assert_eq!(config.proxy_fix.hops.x_port, 1);
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = toml::from_str::<ProxyConfig>("[proxy_fix]\nx_for = -1\n");
        assert!(err.is_err());

        let mut config: ProxyConfig = toml::from_str("[timeouts]\nrequest_secs = 0\n").unwrap();
        apply_env_overrides(&mut config, |_| None);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
