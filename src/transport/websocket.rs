//! WebSocket client transport and event loop.
//!
//! # Event Loop
//!
//! [`WebSocketTransport::connect`] spawns one tokio task that handles:
//!
//! - Incoming text frames, fanned out to frame listeners in arrival order
//! - Outgoing frames queued by [`Transport::send`]
//! - Closure, which flips `is_connected` and notifies close listeners
//!
//! Frame listeners run on this task, so a slow listener delays the next
//! inbound frame.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::config::WebSocketOptions;
use crate::error::{Error, Result};

use super::{CloseListener, FrameListener, Transport};

// ============================================================================
// Types
// ============================================================================

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal commands for the event loop.
enum Outbound {
    /// Write one text frame.
    Frame(String),
    /// Close the socket.
    Close,
}

/// State shared between the handle and the event loop.
struct Shared {
    frame_listeners: Mutex<Vec<FrameListener>>,
    close_listeners: Mutex<Vec<CloseListener>>,
    connected: AtomicBool,
}

impl Shared {
    fn dispatch(&self, text: &str) {
        let listeners = self.frame_listeners.lock().clone();
        if listeners.is_empty() {
            warn!("Inbound frame with no listener registered");
        }
        for listener in listeners {
            listener(text);
        }
    }

    fn mark_closed(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let listeners = self.close_listeners.lock().clone();
            for listener in listeners {
                listener();
            }
        }
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// WebSocket connection to a BiDi endpoint.
///
/// # Thread Safety
///
/// `WebSocketTransport` is `Send + Sync`; `send` only queues the frame and
/// never blocks.
pub struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
    shared: Arc<Shared>,
}

impl WebSocketTransport {
    /// Connects to the endpoint and spawns the event loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the handshake does not finish in time
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(options: &WebSocketOptions) -> Result<Self> {
        let url = options.url().as_str();
        debug!(url, "Connecting");

        let (ws_stream, _response) = timeout(options.connect_timeout(), connect_async(url))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "connect to {url} timed out after {}ms",
                    options.connect_timeout().as_millis()
                ))
            })??;

        info!(url, "WebSocket connected");
        Ok(Self::from_stream(ws_stream))
    }

    /// Wraps an established stream and spawns the event loop.
    fn from_stream(ws_stream: Stream) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            frame_listeners: Mutex::new(Vec::new()),
            close_listeners: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        });

        tokio::spawn(Self::run_event_loop(ws_stream, outbound_rx, Arc::clone(&shared)));

        Self { outbound, shared }
    }

    /// Closes the socket gracefully.
    pub fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: Stream,
        mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
        shared: Arc<Shared>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Frame received");
                            shared.dispatch(&text);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(Outbound::Frame(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                error!(error = %e, "Failed to write frame");
                                break;
                            }
                            trace!("Frame sent");
                        }

                        Some(Outbound::Close) | None => {
                            debug!("Closing WebSocket");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        shared.mark_closed();
        debug!("Event loop terminated");
    }
}

impl Transport for WebSocketTransport {
    fn register_frame_listener(&self, listener: FrameListener) {
        self.shared.frame_listeners.lock().push(listener);
    }

    fn register_close_listener(&self, listener: CloseListener) {
        self.shared.close_listeners.lock().push(listener);
    }

    fn send(&self, frame: String) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::ConnectionClosed);
        }
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Context;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;

    async fn echo_server() -> anyhow::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };
            while let Some(Ok(message)) = ws.next().await {
                if message.is_text() && ws.send(message).await.is_err() {
                    break;
                }
            }
        });

        Ok(format!("ws://{addr}"))
    }

    #[tokio::test]
    async fn test_round_trip_through_echo_server() -> anyhow::Result<()> {
        let url = echo_server().await?;
        let options = WebSocketOptions::new(&url)?;
        let transport = WebSocketTransport::connect(&options).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        transport.register_frame_listener(Arc::new(move |text: &str| {
            let _ = tx.send(text.to_string());
        }));

        transport.send(r#"{"id":1}"#.to_string())?;
        let echoed = timeout(Duration::from_secs(5), rx.recv())
            .await?
            .context("frame listener dropped")?;
        assert_eq!(echoed, r#"{"id":1}"#);
        assert!(transport.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn test_close_flips_connected_and_notifies() -> anyhow::Result<()> {
        let url = echo_server().await?;
        let options = WebSocketOptions::new(&url)?;
        let transport = WebSocketTransport::connect(&options).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        transport.register_close_listener(Arc::new(move || {
            let _ = tx.send(());
        }));

        transport.close();
        timeout(Duration::from_secs(5), rx.recv())
            .await?
            .context("close listener dropped")?;
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("x".to_string()),
            Err(Error::ConnectionClosed)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_refused() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let options = WebSocketOptions::new(&format!("ws://{addr}"))?;
        let err = WebSocketTransport::connect(&options)
            .await
            .err()
            .context("connect should fail")?;
        assert!(err.is_connection_error());
        Ok(())
    }
}
