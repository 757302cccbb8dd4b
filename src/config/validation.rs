//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All problems are
//! collected so a broken file can be fixed in one pass.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Highest number of trusted hops accepted for any header.
pub const MAX_TRUSTED_HOPS: u32 = 32;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("proxy_fix.prefix {0:?} must be a plain path")]
    Prefix(String),

    #[error("proxy_fix.{header} trusts {hops} hops, maximum is {max}", max = MAX_TRUSTED_HOPS)]
    TooManyHops { header: &'static str, hops: u32 },
}

/// Check a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if let Some(prefix) = &config.proxy_fix.prefix {
        if prefix.chars().any(|c| c == '?' || c == '#' || c.is_whitespace()) {
            errors.push(ValidationError::Prefix(prefix.clone()));
        }
    }

    let hops = &config.proxy_fix.hops;
    for (header, value) in [
        ("x_for", hops.x_for),
        ("x_proto", hops.x_proto),
        ("x_host", hops.x_host),
        ("x_port", hops.x_port),
        ("x_prefix", hops.x_prefix),
    ] {
        if value > MAX_TRUSTED_HOPS {
            errors.push(ValidationError::TooManyHops { header, hops: value });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "localhost".into();
        config.timeouts.request_secs = 0;
        config.proxy_fix.prefix = Some("/app?x=1".into());
        config.proxy_fix.hops.x_host = 100;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("localhost".into()),
                ValidationError::ZeroRequestTimeout,
                ValidationError::Prefix("/app?x=1".into()),
                ValidationError::TooManyHops { header: "x_host", hops: 100 },
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nope".into())])
        );
    }
}
