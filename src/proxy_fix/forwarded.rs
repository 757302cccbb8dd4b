//! Trusted value selection for `X-Forwarded-*` headers.
//!
//! Each proxy in the chain appends what it saw to the header, so the
//! rightmost items were written by the proxies closest to the application.
//! With `hops` trusted proxies, the value at `len - hops` is the one the
//! outermost trusted proxy received from its client. Anything to the left of
//! it came from the client and is ignored.

use axum::http::{HeaderMap, HeaderName};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PORT: HeaderName = HeaderName::from_static("x-forwarded-port");
pub const X_FORWARDED_PREFIX: HeaderName = HeaderName::from_static("x-forwarded-prefix");

/// Select the trusted value of a forwarding header.
///
/// Repeated header lines are treated as one comma separated list. Returns
/// `None` when the header is disabled, absent, not valid text, shorter than
/// the number of trusted hops, or when the selected item is empty.
pub fn trusted_value(headers: &HeaderMap, name: &HeaderName, hops: u32) -> Option<String> {
    if hops == 0 {
        return None;
    }

    let mut items: Vec<&str> = Vec::new();
    for value in headers.get_all(name) {
        let value = match value.to_str() {
            Ok(v) => v,
            Err(_) => {
                tracing::debug!(header = %name, "Ignoring non-text forwarding header");
                return None;
            }
        };
        items.extend(value.split(',').map(str::trim));
    }

    let hops = hops as usize;
    if items.len() < hops {
        if !items.is_empty() {
            tracing::debug!(
                header = %name,
                values = items.len(),
                trusted_hops = hops,
                "Forwarding chain shorter than trusted hops"
            );
        }
        return None;
    }

    let selected = items[items.len() - hops];
    if selected.is_empty() {
        None
    } else {
        Some(selected.to_string())
    }
}
