//! Error types for cattach.

use thiserror::Error;

/// Main error type for attach operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not establish the initial attach connection.
    #[error("failed to connect: {message}")]
    ConnectionFailed { message: String },

    /// The session closed unexpectedly mid-use.
    #[error("disconnected: {message}")]
    Disconnected { message: String },

    /// Socket-level failure on the attach stream.
    ///
    /// Local to the transport; the event loop maps it to `Disconnected`
    /// unless the failure is a benign EOF (an empty read).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Invalid configuration or CLI parameter.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    /// Wrap a transport-level failure.
    pub fn transport(e: impl std::fmt::Display) -> Self {
        Error::Transport {
            message: e.to_string(),
        }
    }

    /// Wrap a connection-establishment failure.
    pub fn connection_failed(e: impl std::fmt::Display) -> Self {
        Error::ConnectionFailed {
            message: e.to_string(),
        }
    }
}

/// Convenience result type for cattach operations.
pub type Result<T> = std::result::Result<T, Error>;
