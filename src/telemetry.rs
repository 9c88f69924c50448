//! Logging initialization for drivers and tests.
//!
//! The engine itself only emits `tracing` events; subscribing to them is
//! the embedder's decision. [`init`] installs a plain stderr formatter
//! honoring `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set, so tests can call
/// it repeatedly.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
