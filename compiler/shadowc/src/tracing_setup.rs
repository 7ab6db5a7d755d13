//! Tracing initialization for the driver binary.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, e.g.
/// `SHADOW_LOG=shadow_tac=trace,info`.
pub const LOG_ENV: &str = "SHADOW_LOG";

/// Install the global subscriber. Quiet by default; the filter comes from
/// the environment.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
