//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize logging to stderr
///
/// `RUST_LOG` wins when set. Otherwise the filter is `debug` with the debug
/// flag and the configured level without it. stdout is left to command output.
pub fn init_logging(debug: bool, level: &str) {
    let fallback = if debug { "debug" } else { level };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(true)
        .with_file(debug)
        .with_line_number(debug)
        .init();
}
