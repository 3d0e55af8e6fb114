//! Logging setup.
//!
//! A single-shot `tracing` subscriber writing human-readable lines to
//! stderr. Level selection comes from `MNEMO_LOG` (standard `EnvFilter`
//! directives), with the CLI verbose flag as a coarser override. Every
//! skip and fallback in the engine logs at least at debug level, so
//! `MNEMO_LOG=debug` shows the full decision trail of a run.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Environment variable carrying `EnvFilter` directives.
pub const LOG_ENV: &str = "MNEMO_LOG";

static INIT: OnceLock<()> = OnceLock::new();

/// Initializes the global tracing subscriber.
///
/// Idempotent: repeat calls are no-ops, which keeps tests that each set
/// up logging from tripping over one another.
pub fn init_logging(verbose: bool) {
    INIT.get_or_init(|| {
        let default_directive = if verbose { "mnemo=debug" } else { "mnemo=info" };
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
        init_logging(false);
    }
}
