//! The attach-session event loop.
//!
//! Multiplexes local terminal input and the remote attach stream on a
//! single task. Local input runs through the disconnect-gesture detector
//! before being forwarded; remote output is written to the local terminal
//! immediately. Once either side reaches EOF the loop keeps servicing
//! both sources for a grace period (the close-wait window) to flush
//! trailing bytes, then terminates.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::debug;

use cattach_core::attach::AttachStream;
use cattach_core::constants::{
    DEFAULT_CLOSE_WAIT, DEFAULT_ESCAPE_CHAR, POLL_INTERVAL, READ_BUFFER_SIZE,
};
use cattach_core::error::{Error, Result};

use crate::escape::{EscapeGesture, GestureAction};

/// How an attach session ended.
///
/// Failures are the `Err` arm of [`EventLoop::run`]; every variant here is
/// a clean, deliberate termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The local disconnect gesture was typed.
    UserExit,
    /// The remote side closed the stream.
    RemoteClosed,
    /// Local input reached EOF.
    LocalClosed,
}

/// Tunable parameters of an attach session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Escape character that begins the disconnect gesture.
    pub escape: u8,
    /// Grace period after either side closes.
    pub close_wait: Duration,
    /// Maximum bytes per local input read.
    pub read_buffer: usize,
    /// Bounded readiness wait between forced wakeups.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            escape: DEFAULT_ESCAPE_CHAR,
            close_wait: DEFAULT_CLOSE_WAIT,
            read_buffer: READ_BUFFER_SIZE,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// The orchestrator: owns the attach stream, the local input channel, and
/// the local output writer for the lifetime of one session.
pub struct EventLoop<S, W> {
    session: S,
    input: mpsc::UnboundedReceiver<Vec<u8>>,
    output: W,
    gesture: EscapeGesture,
    close_wait: Duration,
    poll_interval: Duration,
}

impl<S, W> EventLoop<S, W>
where
    S: AttachStream,
    W: AsyncWrite + Unpin + Send,
{
    /// Build an event loop over an attach stream, a local input channel,
    /// and a local output writer.
    pub fn new(
        session: S,
        input: mpsc::UnboundedReceiver<Vec<u8>>,
        output: W,
        config: &SessionConfig,
    ) -> Self {
        Self {
            session,
            input,
            output,
            gesture: EscapeGesture::new(config.escape),
            close_wait: config.close_wait,
            poll_interval: config.poll_interval,
        }
    }

    /// Drive the session until it ends, then close the attach stream.
    ///
    /// The stream is closed exactly once, on every exit path. Transport
    /// failures surface as [`Error::Disconnected`].
    pub async fn run(mut self) -> Result<SessionOutcome> {
        let result = self.drive().await;
        if let Err(e) = self.session.close().await {
            debug!(error = %e, "error closing attach stream");
        }
        result
    }

    async fn drive(&mut self) -> Result<SessionOutcome> {
        let Self {
            session,
            input,
            output,
            gesture,
            close_wait,
            poll_interval,
        } = self;

        // Set once when the first EOF arrives; never restarted.
        let mut draining: Option<(SessionOutcome, Instant)> = None;
        let mut input_open = true;
        let mut session_open = true;

        loop {
            if let Some((outcome, deadline)) = draining
                && Instant::now() >= deadline
            {
                debug!(?outcome, "close-wait window elapsed");
                return Ok(outcome);
            }

            let wait = match draining {
                Some((_, deadline)) => {
                    (*poll_interval).min(deadline.saturating_duration_since(Instant::now()))
                }
                None => *poll_interval,
            };

            tokio::select! {
                _ = sleep(wait) => {}

                chunk = input.recv(), if input_open => match chunk {
                    None => {
                        debug!("eof on local input");
                        input_open = false;
                        draining.get_or_insert_with(|| {
                            debug!("entering close-wait window");
                            (SessionOutcome::LocalClosed, Instant::now() + *close_wait)
                        });
                    }
                    Some(data) => match gesture.process(data) {
                        GestureAction::Forward(chunks) => {
                            for chunk in chunks {
                                session.send(&chunk).await.map_err(into_disconnected)?;
                            }
                        }
                        GestureAction::Armed => {}
                        GestureAction::Disconnect => {
                            debug!("exit requested by local escape gesture");
                            return Ok(SessionOutcome::UserExit);
                        }
                    },
                },

                received = session.recv(), if session_open => {
                    let data = received.map_err(into_disconnected)?;
                    if data.is_empty() {
                        debug!("eof on attach stream");
                        session_open = false;
                        draining.get_or_insert_with(|| {
                            debug!("entering close-wait window");
                            (SessionOutcome::RemoteClosed, Instant::now() + *close_wait)
                        });
                    } else {
                        output.write_all(&data).await?;
                        output.flush().await?;
                    }
                }
            }
        }
    }
}

fn into_disconnected(e: Error) -> Error {
    match e {
        Error::Transport { message } => Error::Disconnected { message },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Channel-backed stand-in for the websocket session.
    struct FakeStream {
        incoming: mpsc::UnboundedReceiver<Result<Vec<u8>>>,
        sent: mpsc::UnboundedSender<Vec<u8>>,
        close_calls: Arc<AtomicUsize>,
    }

    struct FakeHandle {
        incoming: Option<mpsc::UnboundedSender<Result<Vec<u8>>>>,
        sent: mpsc::UnboundedReceiver<Vec<u8>>,
        close_calls: Arc<AtomicUsize>,
    }

    impl FakeHandle {
        fn push(&self, result: Result<Vec<u8>>) {
            self.incoming.as_ref().unwrap().send(result).unwrap();
        }

        /// Drop the remote sender so the stream reports EOF.
        fn close_remote(&mut self) {
            self.incoming.take();
        }

        fn drained(&mut self) -> Vec<Vec<u8>> {
            let mut sent = Vec::new();
            while let Ok(chunk) = self.sent.try_recv() {
                sent.push(chunk);
            }
            sent
        }

        fn close_count(&self) -> usize {
            self.close_calls.load(Ordering::SeqCst)
        }
    }

    fn fake_stream() -> (FakeStream, FakeHandle) {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let close_calls = Arc::new(AtomicUsize::new(0));
        (
            FakeStream {
                incoming: incoming_rx,
                sent: sent_tx,
                close_calls: close_calls.clone(),
            },
            FakeHandle {
                incoming: Some(incoming_tx),
                sent: sent_rx,
                close_calls,
            },
        )
    }

    #[async_trait]
    impl AttachStream for FakeStream {
        async fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent
                .send(data.to_vec())
                .map_err(|_| Error::transport("send on closed stream"))
        }

        async fn recv(&mut self) -> Result<Vec<u8>> {
            match self.incoming.recv().await {
                Some(result) => result,
                None => Ok(Vec::new()),
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig {
            close_wait: Duration::from_millis(100),
            poll_interval: Duration::from_millis(50),
            ..SessionConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_local_bytes_in_order() {
        let (stream, mut handle) = fake_stream();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(stream, input_rx, tokio::io::sink(), &test_config());

        input_tx.send(b"ls -l".to_vec()).unwrap();
        input_tx.send(b"\r".to_vec()).unwrap();
        input_tx.send(b"exit".to_vec()).unwrap();
        drop(input_tx);

        let outcome = event_loop.run().await.unwrap();
        assert_eq!(outcome, SessionOutcome::LocalClosed);
        assert_eq!(
            handle.drained(),
            vec![b"ls -l".to_vec(), b"\r".to_vec(), b"exit".to_vec()]
        );
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_output_reaches_local_writer() {
        let (stream, mut handle) = fake_stream();
        let (_input_tx, input_rx) = mpsc::unbounded_channel();
        let (writer, mut read_side) = tokio::io::duplex(4096);
        let event_loop = EventLoop::new(stream, input_rx, writer, &test_config());

        handle.push(Ok(b"$ hello".to_vec()));
        handle.close_remote();

        let outcome = event_loop.run().await.unwrap();
        assert_eq!(outcome, SessionOutcome::RemoteClosed);

        let mut out = vec![0u8; 7];
        tokio::io::AsyncReadExt::read_exact(&mut read_side, &mut out)
            .await
            .unwrap();
        assert_eq!(&out, b"$ hello");
    }

    #[tokio::test(start_paused = true)]
    async fn escape_gesture_ends_session_without_forwarding() {
        let (stream, mut handle) = fake_stream();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(stream, input_rx, tokio::io::sink(), &test_config());

        input_tx.send(b"\r".to_vec()).unwrap();
        input_tx.send(b"~".to_vec()).unwrap();
        input_tx.send(b".".to_vec()).unwrap();

        let outcome = event_loop.run().await.unwrap();
        assert_eq!(outcome, SessionOutcome::UserExit);
        // Only the carriage return went to the remote.
        assert_eq!(handle.drained(), vec![b"\r".to_vec()]);
        assert_eq!(handle.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_gesture_flushes_escape_then_chunk() {
        let (stream, mut handle) = fake_stream();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(stream, input_rx, tokio::io::sink(), &test_config());

        input_tx.send(b"\r".to_vec()).unwrap();
        input_tx.send(b"~".to_vec()).unwrap();
        input_tx.send(b"a".to_vec()).unwrap();
        drop(input_tx);

        let outcome = event_loop.run().await.unwrap();
        assert_eq!(outcome, SessionOutcome::LocalClosed);
        assert_eq!(
            handle.drained(),
            vec![b"\r".to_vec(), b"~".to_vec(), b"a".to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drain_window_runs_past_remote_eof() {
        let (stream, mut handle) = fake_stream();
        let (_input_tx, input_rx) = mpsc::unbounded_channel();
        let config = test_config();
        let event_loop = EventLoop::new(stream, input_rx, tokio::io::sink(), &config);

        handle.close_remote();

        let started = Instant::now();
        let outcome = event_loop.run().await.unwrap();
        assert_eq!(outcome, SessionOutcome::RemoteClosed);
        assert!(started.elapsed() >= config.close_wait);
    }

    #[tokio::test(start_paused = true)]
    async fn second_eof_does_not_restart_drain_timer() {
        let (stream, mut handle) = fake_stream();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let config = test_config();
        let event_loop = EventLoop::new(stream, input_rx, tokio::io::sink(), &config);

        // Remote EOF first, local EOF shortly after.
        handle.close_remote();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            drop(input_tx);
        });

        let started = Instant::now();
        let outcome = event_loop.run().await.unwrap();
        // The first EOF's outcome and deadline win.
        assert_eq!(outcome, SessionOutcome::RemoteClosed);
        let elapsed = started.elapsed();
        assert!(elapsed >= config.close_wait);
        assert!(elapsed < config.close_wait + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn local_input_is_serviced_during_drain() {
        let (stream, mut handle) = fake_stream();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(stream, input_rx, tokio::io::sink(), &test_config());

        handle.close_remote();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            let _ = input_tx.send(b"late".to_vec());
        });

        let outcome = event_loop.run().await.unwrap();
        assert_eq!(outcome, SessionOutcome::RemoteClosed);
        assert_eq!(handle.drained(), vec![b"late".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_maps_to_disconnected() {
        let (stream, handle) = fake_stream();
        let (_input_tx, input_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(stream, input_rx, tokio::io::sink(), &test_config());

        handle.push(Err(Error::transport("connection reset")));

        let err = event_loop.run().await.unwrap_err();
        assert!(matches!(err, Error::Disconnected { .. }));
        assert_eq!(handle.close_count(), 1);
    }
}
