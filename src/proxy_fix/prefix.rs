//! Static mount prefix handling.
//!
//! An application mounted at `/app` behind a proxy that forwards the full
//! path receives `/app/items`. Stripping the prefix lets the application
//! route on `/items` while remembering `/app` for building external links.

/// Normalize a configured prefix.
///
/// Trailing slashes are removed and a leading slash is added. An empty prefix
/// or `/` means the application is mounted at the root.
pub fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Remove `prefix` from the start of `path`.
///
/// Matches only whole path segments, so `/app` strips `/app/items` but not
/// `/application`. Returns `None` when the path is outside the prefix.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
