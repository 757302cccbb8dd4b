//! Request extensions describing how a request was resolved.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::Serialize;
use url::Url;

use crate::proxy_fix::host::default_port;

/// The client-facing view of a request after the proxy fix was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardedInfo {
    /// Client address, from `X-Forwarded-For` or the peer socket.
    pub remote_addr: Option<String>,
    /// Lower-cased URL scheme.
    pub scheme: String,
    /// Host name without port.
    pub host: Option<String>,
    /// Explicit port, if the host carried one or `X-Forwarded-Port` was trusted.
    pub port: Option<u16>,
    /// Mount prefix without trailing slash, empty at the root.
    pub prefix: String,
}

impl ForwardedInfo {
    /// `host[:port]`, omitting the port when it is the scheme's default.
    pub fn authority(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        match self.port {
            Some(port) if Some(port) != default_port(&self.scheme) => {
                Some(format!("{}:{}", host, port))
            }
            _ => Some(host.to_string()),
        }
    }

    /// Absolute URL a client would use to reach `path` on this application.
    ///
    /// `path` is relative to the mount prefix and may carry a query string.
    pub fn external_url(&self, path: &str) -> Result<Url, url::ParseError> {
        let authority = self.authority().ok_or(url::ParseError::EmptyHost)?;
        let mut url = Url::parse(&format!("{}://{}", self.scheme, authority))?;

        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        url.set_path(&format!("{}{}", self.prefix, path));
        url.set_query(query);
        Ok(url)
    }
}

impl<S> FromRequestParts<S> for ForwardedInfo
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ForwardedInfo>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "ProxyFixLayer is not installed",
        ))
    }
}

/// Request values as received from the proxy, before any rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalRequest {
    pub remote_addr: Option<String>,
    pub scheme: String,
    /// Raw `Host` header.
    pub host: Option<String>,
    pub path: String,
}
