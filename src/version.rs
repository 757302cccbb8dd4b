//! Build version resolution.
//!
//! Tagged CI builds carry the plain crate version. Every other build is a
//! development build suffixed with the CI pipeline that produced it.

use std::sync::OnceLock;

/// Crate version as declared in `Cargo.toml`.
pub const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve the version string for a build.
///
/// `commit_tag` only matters by presence: a tag that is set but empty still
/// marks a release. An empty pipeline id counts as absent.
pub fn resolve_version(base: &str, commit_tag: Option<&str>, pipeline_id: Option<&str>) -> String {
    if commit_tag.is_some() {
        return base.to_string();
    }

    let pipeline = pipeline_id.filter(|id| !id.is_empty()).unwrap_or("None");
    format!("{}.dev{}", base, pipeline)
}

/// Version of this binary, resolved from the CI environment at compile time.
pub fn build_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        resolve_version(
            BASE_VERSION,
            option_env!("CI_COMMIT_TAG"),
            option_env!("CI_PIPELINE_ID"),
        )
    })
}

/// Whether this binary was built from a tagged commit.
pub fn is_release() -> bool {
    option_env!("CI_COMMIT_TAG").is_some()
}
