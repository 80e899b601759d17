//! Tracing subscriber setup for test binaries.

use tracing_subscriber::EnvFilter;

fn filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "info" } else { "warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a human-readable subscriber
///
/// `RUST_LOG` takes precedence; otherwise `info` when `verbose`, `warn`
/// when not. Returns `false` if a global subscriber was already set.
pub fn init_tracing(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber, for CI log collectors
pub fn init_json_tracing(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(verbose))
        .try_init()
        .is_ok()
}
