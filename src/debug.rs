//! Debug knobs from the environment
//!
//! `DBPERFDEBUG` is a comma-separated list of `name=value` pairs:
//!
//! - `routing=1` logs every key -> worker routing decision (needs `RUST_LOG=debug`)
//! - `progress=N` logs a progress line every N completed queries

use dbperf_core::DebugConfig;

/// Environment variable holding the debug knobs
pub const DEBUG_ENV: &str = "DBPERFDEBUG";

/// Read the debug knobs once at startup
pub fn from_env() -> DebugConfig {
    let knobs = from_value(std::env::var(DEBUG_ENV).ok().as_deref());
    if knobs.is_enabled() {
        tracing::info!(?knobs, "Debug knobs enabled");
    }
    knobs
}

fn from_value(value: Option<&str>) -> DebugConfig {
    value.map(DebugConfig::parse).unwrap_or_default()
}
