//! Structured logging setup backed by `tracing`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a global `tracing` subscriber: an `EnvFilter` seeded from
/// `default_level` (overridable via `RUST_LOG`) plus a formatting layer.
/// Call once, at process start.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
