//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. `verbosity` counts `-v` flags;
/// `RUST_LOG` always takes precedence when set.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}
