//! CLI argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use cattach_core::constants::{DEFAULT_API_VERSION, POLL_INTERVAL, READ_BUFFER_SIZE};
use cattach_core::endpoint::ContainerEndpoint;
use cattach_core::error::{Error, Result};

use crate::event_loop::SessionConfig;

/// Log output format for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for cattach_core::LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => cattach_core::LogFormat::Text,
            CliLogFormat::Json => cattach_core::LogFormat::Json,
        }
    }
}

/// Attach to a remote container's console.
#[derive(Debug, Parser)]
#[command(name = "cattach", version, about)]
pub struct Cli {
    /// Container API host, host:port
    pub host: String,

    /// Container ID or name
    pub container: String,

    /// Remote API version prefix for the attach endpoint
    #[arg(long, value_name = "VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Escape character that begins the disconnect gesture
    #[arg(short, long, default_value_t = '~')]
    pub escape: char,

    /// Seconds to keep draining I/O after either side closes
    #[arg(long, value_name = "SECONDS", default_value_t = 0.5)]
    pub close_wait: f64,

    /// Increase log verbosity (-v, -vv, ...)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Text)]
    pub log_format: CliLogFormat,
}

impl Cli {
    /// The remote endpoint these arguments describe.
    pub fn endpoint(&self) -> ContainerEndpoint {
        ContainerEndpoint::new(&self.host, &self.container, &self.api_version)
    }

    /// Session parameters, validated.
    pub fn session_config(&self) -> Result<SessionConfig> {
        if !self.escape.is_ascii() {
            return Err(Error::InvalidConfig {
                message: format!("escape character must be a single ASCII byte, got {:?}", self.escape),
            });
        }
        if !(self.close_wait.is_finite() && self.close_wait >= 0.0) {
            return Err(Error::InvalidConfig {
                message: format!("close-wait must be a non-negative duration, got {}", self.close_wait),
            });
        }
        Ok(SessionConfig {
            escape: self.escape as u8,
            close_wait: Duration::from_secs_f64(self.close_wait),
            read_buffer: READ_BUFFER_SIZE,
            poll_interval: POLL_INTERVAL,
        })
    }
}
