//! Tracing setup for graft.
//!
//! Everything logs through `tracing`; this crate installs the subscriber.
//! The filter comes from `RUST_LOG` when it is set and parses, otherwise
//! from the default the caller passes. Output goes to stderr so stdout
//! stays free for command output.
//!
//! ```bash
//! RUST_LOG=graft_connector=debug graft tree --config graft.ron
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Build the filter: `RUST_LOG` if usable, else `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init(default: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

/// Subscriber for tests: output is captured per test by the harness.
pub fn init_for_tests() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}
