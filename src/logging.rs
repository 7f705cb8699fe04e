//! Tracing subscriber setup for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Install an env-filtered fmt subscriber. `RUST_LOG` controls the level,
/// defaulting to `info`. Safe to call more than once; later calls are
/// no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
