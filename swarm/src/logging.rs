//! Diagnostic tracing for the swarm CLI.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. The run log under
//! `run_log.dir` is a separate product artifact and does not depend on it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `warn`, or `info` with
/// `verbose`.
///
/// ```bash
/// RUST_LOG=swarm=debug article-swarm "Rust error handling"
/// ```
pub fn init(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
