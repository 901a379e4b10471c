//! Local terminal handling: raw mode, size queries, stdin/stdout plumbing.

use std::io::{self, Read};
use std::os::unix::io::{AsRawFd, RawFd};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use cattach_core::constants::{ENV_COLS, ENV_ROWS};
use cattach_core::error::{Error, Result};

/// Scoped raw-mode acquisition for the local terminal.
///
/// If stdin is not an interactive terminal, acquisition is a no-op and so
/// is release. The saved mode is restored exactly once, on [`release`]
/// (idempotent) or on drop, so every exit path puts the terminal back.
///
/// [`release`]: TtyGuard::release
pub struct TtyGuard {
    fd: RawFd,
    saved: Option<libc::termios>,
}

impl TtyGuard {
    /// Capture the current terminal mode and switch to raw mode.
    pub fn acquire() -> Result<Self> {
        let fd = io::stdin().as_raw_fd();

        if unsafe { libc::isatty(fd) } != 1 {
            debug!("stdin is not a terminal, leaving mode untouched");
            return Ok(Self { fd, saved: None });
        }

        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        let original = unsafe { termios.assume_init() };

        let mut raw = original;

        // Input flags: no break signal, CR->NL mapping, parity checking,
        // 8th bit stripping, or XON/XOFF flow control
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);

        // Output flags: no output processing
        raw.c_oflag &= !libc::OPOST;

        // Control flags: 8-bit characters
        raw.c_cflag |= libc::CS8;

        // Local flags: no echo, canonical mode, signal keys, or extended input
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);

        // Reads return after 1 byte, no timeout
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        debug!("entered raw terminal mode");
        Ok(Self {
            fd,
            saved: Some(original),
        })
    }

    /// Restore the saved terminal mode, draining pending output first.
    ///
    /// Safe to call when nothing was acquired; does nothing the second time.
    pub fn release(&mut self) {
        if let Some(original) = self.saved.take() {
            if unsafe { libc::tcsetattr(self.fd, libc::TCSADRAIN, &original) } != 0 {
                warn!("failed to restore terminal mode");
            } else {
                debug!("restored terminal mode");
            }
        }
    }

    /// True if raw mode was actually entered and not yet released.
    pub fn is_raw(&self) -> bool {
        self.saved.is_some()
    }
}

impl Drop for TtyGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Current terminal dimensions as (rows, cols).
///
/// Queries the `TIOCGWINSZ` ioctl on stdout; if stdout is not a terminal
/// or the ioctl fails, falls back to the `LINES`/`COLUMNS` environment
/// variables. Returns `None` when neither source is available, in which
/// case no resize request should be issued.
pub fn tty_size() -> Option<(u16, u16)> {
    ioctl_size(io::stdout().as_raw_fd()).or_else(env_size)
}

fn ioctl_size(fd: RawFd) -> Option<(u16, u16)> {
    if unsafe { libc::isatty(fd) } != 1 {
        return None;
    }

    let mut winsize = std::mem::MaybeUninit::<libc::winsize>::uninit();
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, winsize.as_mut_ptr()) } != 0 {
        return None;
    }

    let winsize = unsafe { winsize.assume_init() };
    if winsize.ws_row == 0 || winsize.ws_col == 0 {
        return None;
    }
    Some((winsize.ws_row, winsize.ws_col))
}

fn env_size() -> Option<(u16, u16)> {
    let rows = std::env::var(ENV_ROWS).ok()?.parse().ok()?;
    let cols = std::env::var(ENV_COLS).ok()?.parse().ok()?;
    Some((rows, cols))
}

/// Spawn a blocking reader thread feeding local input chunks into a channel.
///
/// Chunks are at most `buffer` bytes per read. The channel ends (receiver
/// sees `None`) on local EOF. Interrupted reads are retried, so a signal
/// landing mid-read never tears down the session.
pub fn spawn_stdin_reader(buffer: usize) -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = io::stdin();
        let mut stdin_lock = stdin.lock();
        let mut buf = vec![0u8; buffer];

        loop {
            match stdin_lock.read(&mut buf) {
                Ok(0) => {
                    debug!("eof on stdin");
                    break;
                }
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        debug!("stdin receiver dropped");
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "stdin read error");
                    break;
                }
            }
        }
        debug!("stdin reader thread exiting");
    });

    rx
}

/// Serializes tests that mutate the `LINES`/`COLUMNS` environment.
#[cfg(test)]
pub(crate) fn tests_env_lock() -> &'static std::sync::Mutex<()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    &LOCK
}
