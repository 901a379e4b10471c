//! Tracing integration for structured logging.
//!
//! Verbosity-driven setup with optional file output and a text or JSON
//! format. Components emit events through `tracing`; nothing in the core
//! writes to stdout or stderr directly.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::Result;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

/// Initialize the logging system.
///
/// `verbosity` maps 0=error, 1=warn, 2=info, 3=debug, 4+=trace; a
/// `RUST_LOG` environment variable overrides the default filter.
pub fn init_logging(verbosity: u8, log_file: Option<&Path>, format: LogFormat) -> Result<()> {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cattach={level},cattach_core={level},cattach_client={level}"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let init_err = |e: tracing_subscriber::util::TryInitError| {
        crate::Error::Io(std::io::Error::other(e.to_string()))
    };

    match (log_file, format) {
        (None, LogFormat::Text) => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(verbosity >= 3)
                    .with_line_number(verbosity >= 3),
            )
            .try_init()
            .map_err(init_err)?,
        (None, LogFormat::Json) => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(init_err)?,
        (Some(path), text_or_json) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            match text_or_json {
                LogFormat::Text => registry
                    .with(
                        fmt::layer()
                            .with_writer(file)
                            .with_ansi(false)
                            .with_target(true)
                            .with_file(verbosity >= 3)
                            .with_line_number(verbosity >= 3),
                    )
                    .try_init()
                    .map_err(init_err)?,
                LogFormat::Json => registry
                    .with(fmt::layer().json().with_writer(file))
                    .try_init()
                    .map_err(init_err)?,
            }
        }
    }

    Ok(())
}

/// Initialize logging with defaults for testing.
///
/// Silently ignores errors (the subscriber may already be installed).
pub fn init_test_logging() {
    let _ = init_logging(2, None, LogFormat::Text);
}
