//! Rebuilding the client-facing request from proxy headers.
//!
//! Resolution is a pure function of the headers, URI and peer address so it
//! can be tested without a server. [`ProxyFix::apply`] then writes the result
//! back into the request.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use axum::extract::ConnectInfo;
use axum::http::{
    header::HOST,
    uri::{Authority, PathAndQuery},
    HeaderMap, HeaderValue, Request, Uri,
};

use crate::config::{ProxyFixConfig, TrustedHops};
use crate::observability::metrics;
use crate::proxy_fix::forwarded::{
    trusted_value, X_FORWARDED_FOR, X_FORWARDED_HOST, X_FORWARDED_PORT, X_FORWARDED_PREFIX,
    X_FORWARDED_PROTO,
};
use crate::proxy_fix::host::{split_host_port, with_port};
use crate::proxy_fix::info::{ForwardedInfo, OriginalRequest};
use crate::proxy_fix::prefix::{normalize_prefix, strip_prefix};

/// Compiled proxy fix settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyFix {
    hops: TrustedHops,
    prefix: Option<String>,
}

/// Everything the fix decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub info: ForwardedInfo,
    pub original: OriginalRequest,
    /// Path to route on, after prefix stripping.
    pub path: String,
    /// New `Host` header value, when forwarding headers changed it.
    pub host_header: Option<String>,
    /// Headers whose trusted value was used.
    pub applied: Vec<&'static str>,
    /// Headers whose trusted value was present but unusable.
    pub rejected: Vec<&'static str>,
}

impl ProxyFix {
    pub fn new(config: &ProxyFixConfig) -> Self {
        Self {
            hops: config.hops,
            prefix: config.prefix.as_deref().and_then(normalize_prefix),
        }
    }

    pub fn hops(&self) -> &TrustedHops {
        &self.hops
    }

    /// Normalized static mount prefix.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Work out the client-facing view of a request.
    pub fn resolve(&self, headers: &HeaderMap, uri: &Uri, peer: Option<SocketAddr>) -> Resolution {
        let received_host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let original = OriginalRequest {
            remote_addr: peer.map(|addr| addr.ip().to_string()),
            scheme: uri.scheme_str().unwrap_or("http").to_ascii_lowercase(),
            host: received_host.clone(),
            path: uri.path().to_string(),
        };

        let mut applied = Vec::new();
        let mut rejected = Vec::new();

        let mut path = original.path.clone();
        let mut mount = String::new();
        if let Some(prefix) = &self.prefix {
            mount = prefix.clone();
            if let Some(rest) = strip_prefix(&path, prefix) {
                path = rest.to_string();
            }
        }

        let mut remote_addr = original.remote_addr.clone();
        if let Some(value) = trusted_value(headers, &X_FORWARDED_FOR, self.hops.x_for) {
            remote_addr = Some(value);
            applied.push("x-forwarded-for");
        }

        let mut scheme = original.scheme.clone();
        if let Some(value) = trusted_value(headers, &X_FORWARDED_PROTO, self.hops.x_proto) {
            if is_valid_scheme(&value) {
                scheme = value.to_ascii_lowercase();
                applied.push("x-forwarded-proto");
            } else {
                tracing::debug!(value = %value, "Ignoring invalid X-Forwarded-Proto");
                rejected.push("x-forwarded-proto");
            }
        }

        let mut host = received_host.or_else(|| uri.authority().map(|a| a.to_string()));
        let mut host_changed = false;
        if let Some(value) = trusted_value(headers, &X_FORWARDED_HOST, self.hops.x_host) {
            if is_valid_forwarded_host(&value) {
                host = Some(value);
                host_changed = true;
                applied.push("x-forwarded-host");
            } else {
                tracing::debug!(value = %value, "Ignoring invalid X-Forwarded-Host");
                rejected.push("x-forwarded-host");
            }
        }

        let mut forwarded_port = None;
        if let Some(value) = trusted_value(headers, &X_FORWARDED_PORT, self.hops.x_port) {
            match value.parse::<u16>() {
                Ok(port) => {
                    forwarded_port = Some(port);
                    if let Some(h) = host.as_deref() {
                        host = Some(with_port(h, port));
                        host_changed = true;
                    }
                    applied.push("x-forwarded-port");
                }
                Err(_) => {
                    tracing::debug!(value = %value, "Ignoring invalid X-Forwarded-Port");
                    rejected.push("x-forwarded-port");
                }
            }
        }

        if let Some(value) = trusted_value(headers, &X_FORWARDED_PREFIX, self.hops.x_prefix) {
            mount = normalize_prefix(&value).unwrap_or_default();
            applied.push("x-forwarded-prefix");
        }

        let (host_name, port) = match host.as_deref() {
            Some(h) => {
                let (name, port) = split_host_port(h);
                (Some(name.to_string()), port.and_then(|p| p.parse::<u16>().ok()))
            }
            None => (None, None),
        };

        Resolution {
            info: ForwardedInfo {
                remote_addr,
                scheme,
                host: host_name,
                port: forwarded_port.or(port),
                prefix: mount,
            },
            original,
            path,
            host_header: if host_changed { host } else { None },
            applied,
            rejected,
        }
    }

    /// Resolve `req` and rewrite it in place.
    ///
    /// Updates the `Host` header, the URI path and `ConnectInfo<SocketAddr>`
    /// (when the forwarded client is an IP address), then inserts
    /// [`ForwardedInfo`] and [`OriginalRequest`] as extensions.
    pub fn apply<B>(&self, req: &mut Request<B>) {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let resolution = self.resolve(req.headers(), req.uri(), peer);

        metrics::record_request();
        for header in resolution.applied.iter().copied() {
            metrics::record_header_applied(header);
        }
        for header in resolution.rejected.iter().copied() {
            metrics::record_header_rejected(header);
        }

        if let Some(host) = &resolution.host_header {
            match HeaderValue::from_str(host) {
                Ok(value) => {
                    req.headers_mut().insert(HOST, value);
                }
                Err(e) => tracing::debug!(host = %host, error = %e, "Cannot rewrite Host header"),
            }
        }

        if resolution.path != req.uri().path() {
            match rewrite_path(req.uri(), &resolution.path) {
                Ok(uri) => *req.uri_mut() = uri,
                Err(e) => tracing::debug!(path = %resolution.path, error = %e, "Cannot rewrite path"),
            }
        }

        if let (Some(peer), Some(client)) = (peer, resolution.info.remote_addr.as_deref()) {
            if let Some(ip) = parse_client_ip(client) {
                req.extensions_mut()
                    .insert(ConnectInfo(SocketAddr::new(ip, peer.port())));
            }
        }

        tracing::trace!(
            remote_addr = ?resolution.info.remote_addr,
            scheme = %resolution.info.scheme,
            host = ?resolution.info.host,
            prefix = %resolution.info.prefix,
            applied = ?resolution.applied,
            "Proxy fix applied"
        );

        req.extensions_mut().insert(resolution.info);
        req.extensions_mut().insert(resolution.original);
    }
}

fn is_valid_scheme(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// A bare `host[:port]`: no userinfo, and any port fits in 16 bits.
fn is_valid_forwarded_host(value: &str) -> bool {
    if value.contains('@') || Authority::from_str(value).is_err() {
        return false;
    }
    let (name, port) = split_host_port(value);
    !name.is_empty() && port.map_or(true, |p| p.parse::<u16>().is_ok())
}

/// Client IP from an `X-Forwarded-For` item: `ip`, `[v6]`, `ip:port` or `[v6]:port`.
fn parse_client_ip(value: &str) -> Option<IpAddr> {
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .and_then(|v| v.parse::<IpAddr>().ok())
}

fn rewrite_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::from_str(&path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(hops: TrustedHops, prefix: Option<&str>) -> ProxyFix {
        ProxyFix::new(&ProxyFixConfig {
            hops,
            prefix: prefix.map(str::to_string),
        })
    }

    fn all_hops(n: u32) -> TrustedHops {
        TrustedHops {
            x_for: n,
            x_proto: n,
            x_host: n,
            x_port: n,
            x_prefix: n,
        }
    }

    fn request(uri: &str, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri(uri).header("host", "backend:5000");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap()
    }

    fn peer() -> SocketAddr {
        "10.0.0.2:41000".parse().unwrap()
    }

    #[test]
    fn passthrough_without_headers() {
        let req = request("/items?x=1", &[]);
        let r = fix(all_hops(1), None).resolve(req.headers(), req.uri(), Some(peer()));

        assert_eq!(r.info.remote_addr.as_deref(), Some("10.0.0.2"));
        assert_eq!(r.info.scheme, "http");
        assert_eq!(r.info.host.as_deref(), Some("backend"));
        assert_eq!(r.info.port, Some(5000));
        assert_eq!(r.info.prefix, "");
        assert_eq!(r.path, "/items");
        assert_eq!(r.host_header, None);
        assert!(r.applied.is_empty());
    }

    #[test]
    fn default_hops_trust_for_and_proto_only() {
        let req = request(
            "/",
            &[
                ("x-forwarded-for", "203.0.113.7"),
                ("x-forwarded-proto", "HTTPS"),
                ("x-forwarded-host", "example.com"),
                ("x-forwarded-prefix", "/app"),
            ],
        );
        let r = fix(TrustedHops::default(), None).resolve(req.headers(), req.uri(), Some(peer()));

        assert_eq!(r.info.remote_addr.as_deref(), Some("203.0.113.7"));
        assert_eq!(r.info.scheme, "https");
        assert_eq!(r.info.host.as_deref(), Some("backend"));
        assert_eq!(r.info.prefix, "");
        assert_eq!(r.applied, vec!["x-forwarded-for", "x-forwarded-proto"]);
    }

    #[test]
    fn forwarded_host_and_port() {
        let req = request(
            "/",
            &[
                ("x-forwarded-host", "example.com:8080"),
                ("x-forwarded-port", "8443"),
            ],
        );
        let r = fix(all_hops(1), None).resolve(req.headers(), req.uri(), None);

        assert_eq!(r.host_header.as_deref(), Some("example.com:8443"));
        assert_eq!(r.info.host.as_deref(), Some("example.com"));
        assert_eq!(r.info.port, Some(8443));
    }

    #[test]
    fn forwarded_port_on_ipv6_host() {
        let req = request(
            "/",
            &[("x-forwarded-host", "[2001:db8::1]"), ("x-forwarded-port", "8000")],
        );
        let r = fix(all_hops(1), None).resolve(req.headers(), req.uri(), None);

        assert_eq!(r.host_header.as_deref(), Some("[2001:db8::1]:8000"));
        assert_eq!(r.info.host.as_deref(), Some("[2001:db8::1]"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let req = request(
            "/",
            &[
                ("x-forwarded-proto", "ht tp"),
                ("x-forwarded-host", "bad host"),
                ("x-forwarded-port", "http"),
            ],
        );
        let r = fix(all_hops(1), None).resolve(req.headers(), req.uri(), None);

        assert_eq!(r.info.scheme, "http");
        assert_eq!(r.info.host.as_deref(), Some("backend"));
        assert_eq!(r.host_header, None);
        assert_eq!(
            r.rejected,
            vec!["x-forwarded-proto", "x-forwarded-host", "x-forwarded-port"]
        );

        for bad_host in ["user@evil.example", "example.com:99999", ":8080"] {
            let req = request("/", &[("x-forwarded-host", bad_host)]);
            let r = fix(all_hops(1), None).resolve(req.headers(), req.uri(), None);

            assert_eq!(r.host_header, None, "{bad_host} must not reach the Host header");
            assert_eq!(r.info.host.as_deref(), Some("backend"));
            assert_eq!(r.info.port, Some(5000));
            assert_eq!(r.rejected, vec!["x-forwarded-host"]);
            assert!(r.applied.is_empty());
        }
    }

    #[test]
    fn forwarded_client_with_brackets_or_port() {
        for (client, expected) in [
            ("[2001:db8::1]", "[2001:db8::1]:41000"),
            ("[2001:db8::1]:5555", "[2001:db8::1]:41000"),
            ("203.0.113.7:5555", "203.0.113.7:41000"),
            ("2001:db8::2", "[2001:db8::2]:41000"),
        ] {
            let mut req = request("/", &[("x-forwarded-for", client)]);
            req.extensions_mut().insert(ConnectInfo(peer()));

            fix(TrustedHops::default(), None).apply(&mut req);

            let ConnectInfo(addr) = req.extensions().get::<ConnectInfo<SocketAddr>>().unwrap();
            assert_eq!(*addr, expected.parse::<SocketAddr>().unwrap(), "client {client}");
        }
    }

    #[test]
    fn static_prefix_is_stripped() {
        let req = request("/app/items", &[]);
        let r = fix(TrustedHops::default(), Some("/app/")).resolve(req.headers(), req.uri(), None);
        assert_eq!(r.path, "/items");
        assert_eq!(r.info.prefix, "/app");

        let req = request("/health", &[]);
        let r = fix(TrustedHops::default(), Some("/app")).resolve(req.headers(), req.uri(), None);
        assert_eq!(r.path, "/health");
        assert_eq!(r.info.prefix, "/app");
    }

    #[test]
    fn forwarded_prefix_overrides_static_prefix() {
        let req = request("/app/items", &[("x-forwarded-prefix", "/public/")]);
        let r = fix(all_hops(1), Some("/app")).resolve(req.headers(), req.uri(), None);
        assert_eq!(r.path, "/items");
        assert_eq!(r.info.prefix, "/public");

        let req = request("/items", &[("x-forwarded-prefix", "/")]);
        let r = fix(all_hops(1), Some("/app")).resolve(req.headers(), req.uri(), None);
        assert_eq!(r.info.prefix, "");
    }

    #[test]
    fn apply_rewrites_request() {
        let mut req = request(
            "/app/items?page=2",
            &[
                ("x-forwarded-for", "198.51.100.4, 203.0.113.7"),
                ("x-forwarded-host", "example.com"),
            ],
        );
        req.extensions_mut().insert(ConnectInfo(peer()));

        fix(all_hops(1), Some("/app")).apply(&mut req);

        assert_eq!(req.uri().path(), "/items");
        assert_eq!(req.uri().query(), Some("page=2"));
        assert_eq!(req.headers()[HOST], "example.com");

        let ConnectInfo(addr) = req.extensions().get::<ConnectInfo<SocketAddr>>().unwrap();
        assert_eq!(*addr, "203.0.113.7:41000".parse::<SocketAddr>().unwrap());

        let info = req.extensions().get::<ForwardedInfo>().unwrap();
        assert_eq!(
            info.external_url("/items").unwrap().as_str(),
            "http://example.com/app/items"
        );

        let original = req.extensions().get::<OriginalRequest>().unwrap();
        assert_eq!(original.path, "/app/items");
        assert_eq!(original.host.as_deref(), Some("backend:5000"));
        assert_eq!(original.remote_addr.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn apply_keeps_connect_info_for_non_ip_clients() {
        let mut req = request("/", &[("x-forwarded-for", "unknown")]);
        req.extensions_mut().insert(ConnectInfo(peer()));

        fix(TrustedHops::default(), None).apply(&mut req);

        let ConnectInfo(addr) = req.extensions().get::<ConnectInfo<SocketAddr>>().unwrap();
        assert_eq!(*addr, peer());
        let info = req.extensions().get::<ForwardedInfo>().unwrap();
        assert_eq!(info.remote_addr.as_deref(), Some("unknown"));
    }
}
