//! In-memory transport.
//!
//! Plays the remote end in tests: every frame the engine sends is recorded
//! and can be awaited with [`MemoryTransport::next_sent`], and
//! [`MemoryTransport::inject`] delivers a frame to the engine as if it had
//! arrived from the browser.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::trace;

use crate::error::{Error, Result};

use super::{CloseListener, FrameListener, Transport};

// ============================================================================
// MemoryTransport
// ============================================================================

/// Transport backed by in-process queues.
pub struct MemoryTransport {
    frame_listeners: Mutex<Vec<FrameListener>>,
    close_listeners: Mutex<Vec<CloseListener>>,
    sent_log: Mutex<Vec<String>>,
    sent_tx: mpsc::UnboundedSender<String>,
    sent_rx: AsyncMutex<mpsc::UnboundedReceiver<String>>,
    connected: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryTransport {
    /// Creates an open transport.
    #[must_use]
    pub fn new() -> Self {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        Self {
            frame_listeners: Mutex::new(Vec::new()),
            close_listeners: Mutex::new(Vec::new()),
            sent_log: Mutex::new(Vec::new()),
            sent_tx,
            sent_rx: AsyncMutex::new(sent_rx),
            connected: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Delivers an inbound frame to every registered listener.
    pub fn inject(&self, text: &str) {
        let listeners = self.frame_listeners.lock().clone();
        trace!(len = text.len(), listeners = listeners.len(), "Injecting frame");
        for listener in listeners {
            listener(text);
        }
    }

    /// Delivers a JSON value as an inbound frame.
    pub fn inject_json(&self, value: &Value) {
        self.inject(&value.to_string());
    }

    /// Waits for the next frame sent by the engine.
    pub async fn next_sent(&self) -> Option<String> {
        self.sent_rx.lock().await.recv().await
    }

    /// Waits for the next sent frame and parses it as JSON.
    pub async fn next_sent_json(&self) -> Option<Value> {
        let text = self.next_sent().await?;
        serde_json::from_str(&text).ok()
    }

    /// Returns every frame sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent_log.lock().clone()
    }

    /// Returns the number of frames sent so far.
    #[inline]
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent_log.lock().len()
    }

    /// Makes subsequent writes fail with a connection error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Closes the channel and notifies close listeners.
    pub fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let listeners = self.close_listeners.lock().clone();
            for listener in listeners {
                listener();
            }
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn register_frame_listener(&self, listener: FrameListener) {
        self.frame_listeners.lock().push(listener);
    }

    fn register_close_listener(&self, listener: CloseListener) {
        self.close_listeners.lock().push(listener);
    }

    fn send(&self, frame: String) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::ConnectionClosed);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::connection("write failed"));
        }

        self.sent_log.lock().push(frame.clone());
        self.sent_tx
            .send(frame)
            .map_err(|_| Error::connection("sent queue closed"))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test]
    async fn test_send_records_frames() {
        let transport = MemoryTransport::new();
        transport.send("one".to_string()).expect("send");
        transport.send("two".to_string()).expect("send");

        assert_eq!(transport.next_sent().await.as_deref(), Some("one"));
        assert_eq!(transport.next_sent().await.as_deref(), Some("two"));
        assert_eq!(transport.sent_count(), 2);
    }

    #[test]
    fn test_inject_reaches_listeners() {
        let transport = MemoryTransport::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        transport.register_frame_listener(Arc::new(move |text: &str| {
            assert_eq!(text, "{}");
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        transport.inject("{}");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_notifies_once_and_rejects_sends() {
        let transport = MemoryTransport::new();
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closed);
        transport.register_close_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        transport.close();
        transport.close();

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("x".to_string()),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_fail_writes() {
        let transport = MemoryTransport::new();
        transport.fail_writes(true);
        let err = transport.send("x".to_string()).expect_err("write fails");
        assert!(err.is_connection_error());
        assert_eq!(transport.sent_count(), 0);
    }
}
