//! Logging setup for binaries embedding the pipeline

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,api_maker=debug,tower_http=debug";

/// Install a `fmt` subscriber filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already installed, so tests and
/// embedding applications can call it freely.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
