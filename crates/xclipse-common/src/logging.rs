use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "XCLIPSE_LOG";

static INIT: Once = Once::new();

/// Initialize structured logging with environment filter.
/// Set XCLIPSE_LOG=debug (or trace, info, warn, error) for verbosity control.
///
/// The layer lives inside someone else's process, so this never panics when a
/// global subscriber is already installed and only runs once.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .try_init();
    });
}
