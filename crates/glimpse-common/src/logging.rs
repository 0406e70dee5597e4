use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize structured logging with environment filter.
/// Set GLIMPSE_LOG=debug (or trace, info, warn, error) for verbosity control.
///
/// Safe to call from any hook: the subscriber is installed at most once, and
/// `try_init` tolerates a host process that already set a global subscriber.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("GLIMPSE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
