//! Re-run the build when the CI variables that select the version change.
//!
//! `src/version.rs` reads them through `option_env!`.

fn main() {
    println!("cargo:rerun-if-env-changed=CI_COMMIT_TAG");
    println!("cargo:rerun-if-env-changed=CI_PIPELINE_ID");
}
