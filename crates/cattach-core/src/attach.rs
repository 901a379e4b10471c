//! The attach stream: a duplex byte pipe to the remote console.
//!
//! [`AttachStream`] is the seam the event loop multiplexes on; the remote
//! side is treated as an opaque byte-oriented stream. [`WsAttachSession`]
//! is the websocket-backed implementation speaking to the container API's
//! `attach/ws` endpoint.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, protocol::Message},
};
use tracing::debug;

use crate::endpoint::ContainerEndpoint;
use crate::error::{Error, Result};

/// Duplex byte stream to the remote console.
///
/// An empty chunk from [`recv`](AttachStream::recv) signals remote EOF;
/// socket-level failures surface as [`Error::Transport`].
#[async_trait]
pub trait AttachStream: Send {
    /// Send a chunk of input bytes to the remote side.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive the next chunk of output bytes from the remote side.
    async fn recv(&mut self) -> Result<Vec<u8>>;

    /// Close the stream. Closing an already-closed stream is not an error.
    async fn close(&mut self) -> Result<()>;
}

/// Websocket-backed attach session.
pub struct WsAttachSession {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsAttachSession {
    /// Establish the attach connection to the given endpoint.
    ///
    /// Connection-establishment failures surface as
    /// [`Error::ConnectionFailed`].
    pub async fn connect(endpoint: &ContainerEndpoint) -> Result<Self> {
        let url = endpoint.attach_url();
        debug!(url = %url, "connecting to attach endpoint");

        let (ws, _) = connect_async(&url)
            .await
            .map_err(Error::connection_failed)?;

        debug!(container = %endpoint.container_id, "attach stream established");
        Ok(Self { ws })
    }
}

#[async_trait]
impl AttachStream for WsAttachSession {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.ws
            .send(Message::Binary(data.to_vec()))
            .await
            .map_err(Error::transport)
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.ws.next().await {
                None => return Ok(Vec::new()),
                Some(Ok(Message::Binary(data))) => {
                    // An empty data frame must not masquerade as EOF.
                    if !data.is_empty() {
                        return Ok(data);
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    if !text.is_empty() {
                        return Ok(text.into_bytes());
                    }
                }
                Some(Ok(Message::Close(_))) => return Ok(Vec::new()),
                // Ping/pong replies are handled inside tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(Error::transport(e)),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.ws.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(Error::transport(e)),
        }
    }
}
