//! Handlers of the demonstration server.
//!
//! The echo handler answers every path with how the request was resolved,
//! which is what you want to look at while configuring a proxy.

use axum::{
    extract::Extension,
    http::{HeaderMap, Method, Uri},
    Json,
};
use serde::Serialize;

use crate::http::request::request_id;
use crate::proxy_fix::{ForwardedInfo, OriginalRequest};
use crate::version;

/// Path of the version endpoint, relative to the mount prefix.
pub const VERSION_PATH: &str = "/_proxy_fix/version";

#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub request_id: Option<String>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub remote_addr: Option<String>,
    pub scheme: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub prefix: String,
    pub external_url: Option<String>,
    pub original: OriginalRequest,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub release: bool,
}

pub async fn echo(
    info: ForwardedInfo,
    Extension(original): Extension<OriginalRequest>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<EchoResponse> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let external_url = match info.external_url(path_and_query) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "Cannot build external URL");
            None
        }
    };

    Json(EchoResponse {
        request_id: request_id(&headers),
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        remote_addr: info.remote_addr,
        scheme: info.scheme,
        host: info.host,
        port: info.port,
        prefix: info.prefix,
        external_url,
        original,
    })
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: version::build_version(),
        release: version::is_release(),
    })
}
