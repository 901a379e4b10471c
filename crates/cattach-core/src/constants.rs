//! Configuration constants for cattach.

use std::time::Duration;

/// Escape character that begins the local disconnect gesture.
pub const DEFAULT_ESCAPE_CHAR: u8 = b'~';

/// Character that confirms the disconnect gesture.
pub const GESTURE_CONFIRM_CHAR: u8 = b'.';

/// Grace period after either side closes during which the loop keeps
/// servicing I/O before terminating.
pub const DEFAULT_CLOSE_WAIT: Duration = Duration::from_millis(500);

/// Bounded readiness wait so the loop periodically wakes even without
/// I/O activity.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum bytes read from local input per ready event.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Default remote API version prefix for the attach endpoint.
pub const DEFAULT_API_VERSION: &str = "v1.17";

/// Environment variable consulted for terminal rows when no tty is available.
pub const ENV_ROWS: &str = "LINES";

/// Environment variable consulted for terminal columns when no tty is available.
pub const ENV_COLS: &str = "COLUMNS";
