//! Logging setup shared by the server and client binaries

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber
///
/// Use the RUST_LOG env var to control the log level,
/// e.g. `RUST_LOG=debug` or `RUST_LOG=tinychat=trace`.
pub fn setup_logger(default_directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();
}
