//! Window-resize propagation to the remote console.
//!
//! [`WinchBridge`] turns terminal-resize signals into out-of-band resize
//! requests against the container API. It runs independently of the main
//! event loop: each delivery queries the local terminal size and issues a
//! single best-effort HTTP request, sharing no state with the attach
//! stream.

use async_trait::async_trait;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tracing::debug;

use cattach_core::endpoint::ContainerEndpoint;
use cattach_core::error::{Error, Result};

use crate::terminal;

/// Collaborator that resizes the remote pty.
#[async_trait]
pub trait ResizeRequester: Send + Sync {
    /// Request the remote pty be resized to `rows` × `cols`.
    async fn resize(&self, rows: u16, cols: u16) -> Result<()>;
}

/// HTTP-backed resize requester against the container API.
#[derive(Clone)]
pub struct HttpResizeClient {
    http: reqwest::Client,
    endpoint: ContainerEndpoint,
}

impl HttpResizeClient {
    /// Create a requester for the given endpoint.
    pub fn new(endpoint: ContainerEndpoint) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl ResizeRequester for HttpResizeClient {
    async fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        let url = self.endpoint.resize_url(rows, cols);
        debug!(url = %url, "sending resize request");

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(Error::transport)?;

        if !response.status().is_success() {
            return Err(Error::Transport {
                message: format!("resize request returned {}", response.status()),
            });
        }
        Ok(())
    }
}

/// Scoped bridge from terminal-resize signals to resize requests.
///
/// [`start`](WinchBridge::start) subscribes to `SIGWINCH` for the
/// session's lifetime; dropping the bridge (or calling
/// [`stop`](WinchBridge::stop)) detaches the subscription, so nested or
/// subsequent sessions see their own handlers only. Dimension-query
/// misses skip the request; request failures are swallowed, since the
/// remote may already have terminated.
pub struct WinchBridge {
    task: Option<JoinHandle<()>>,
}

impl WinchBridge {
    /// Install the resize-signal subscription.
    pub fn start<R>(requester: R) -> Result<Self>
    where
        R: ResizeRequester + 'static,
    {
        let mut winch = signal(SignalKind::window_change())?;

        let task = tokio::spawn(async move {
            while winch.recv().await.is_some() {
                let Some((rows, cols)) = terminal::tty_size() else {
                    debug!("terminal size unavailable, skipping resize");
                    continue;
                };
                if let Err(e) = requester.resize(rows, cols).await {
                    debug!(error = %e, "resize request failed");
                }
            }
        });

        debug!("resize signal bridge started");
        Ok(Self { task: Some(task) })
    }

    /// Detach the subscription. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("resize signal bridge stopped");
        }
    }
}

impl Drop for WinchBridge {
    fn drop(&mut self) {
        self.stop();
    }
}
