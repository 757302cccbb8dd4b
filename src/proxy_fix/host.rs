//! Host and port handling for `Host` header values.

/// Split a host value into its name and optional port.
///
/// The split happens at the last `:` unless the value ends with `]`, which
/// marks a bracketed IPv6 literal without a port.
pub fn split_host_port(value: &str) -> (&str, Option<&str>) {
    if value.ends_with(']') {
        return (value, None);
    }
    match value.rsplit_once(':') {
        // An unbracketed IPv6 literal has more than one colon; leave it whole.
        Some((host, _)) if host.contains(':') && !host.starts_with('[') => (value, None),
        Some((host, port)) => (host, Some(port)),
        None => (value, None),
    }
}

/// Replace any port on `host` with `port`.
pub fn with_port(host: &str, port: u16) -> String {
    let (name, _) = split_host_port(host);
    format!("{}:{}", name, port)
}

/// Well-known port for a URL scheme.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}
