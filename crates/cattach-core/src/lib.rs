//! cattach-core: Shared library for the cattach container console client.
//!
//! This crate provides:
//! - Error types shared by the client
//! - Remote endpoint description and URL construction
//! - The attach stream abstraction and its websocket implementation
//! - Logging setup
//! - Configuration constants

pub mod attach;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod logging;

pub use attach::{AttachStream, WsAttachSession};
pub use endpoint::ContainerEndpoint;
pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};
