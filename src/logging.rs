//! Tracing setup.
//!
//! stdout carries the protocol, so every log line goes to stderr.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that overrides `RUST_LOG` for this server.
pub const LOG_ENV: &str = "HTMLSP_LOG";

/// Install the global subscriber.
///
/// The filter comes from `log_level` when given, otherwise `RUST_LOG`, otherwise `info`.
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logger(log_level: Option<&str>, no_color: bool) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}
