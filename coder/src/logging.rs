//! Tracing setup for the `coder` binary.
//!
//! Every file write, retry and rejected reply is logged through `tracing`;
//! this module only decides where those events go.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset so operators see each file
/// action and retry.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=coder=debug coder code --task "add a CLI flag"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
