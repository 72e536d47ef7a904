//! Development-time tracing for the agent.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: diagnostics via `RUST_LOG`, written to stderr.
//!   Not persisted.
//!
//! - **Run logs (`io/run_log`)**: product artifacts in `.minions/runs/`.
//!   Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive when `RUST_LOG` is unset: progress lines from this crate,
/// warnings from everything else.
const DEFAULT_FILTER: &str = "warn,minions=info";

/// Initialize the tracing subscriber.
///
/// # Example
/// ```bash
/// RUST_LOG=minions=debug minions run "add a README"
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
