//! Transport boundary.
//!
//! The engine never opens or closes the channel itself; it talks to a
//! [`Transport`] that delivers inbound text frames to registered listeners
//! and accepts outbound frames.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Engine (Rust)  │                              │  Browser        │
//! │                 │         WebSocket            │                 │
//! │  Transport      │◄────────────────────────────►│  BiDi endpoint  │
//! │  → on_frame     │      ws://host:port/…        │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | `tokio-tungstenite` client with one event loop task |
//! | `memory` | In-process fake remote end for tests and demos |

// ============================================================================
// Submodules
// ============================================================================

/// In-memory transport.
pub mod memory;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::MemoryTransport;
pub use websocket::WebSocketTransport;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked once per inbound text frame, on the transport's reader.
pub type FrameListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback invoked once when the channel closes.
pub type CloseListener = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Transport
// ============================================================================

/// A full-duplex text frame channel.
pub trait Transport: Send + Sync {
    /// Registers a callback for inbound frames.
    fn register_frame_listener(&self, listener: FrameListener);

    /// Registers a callback for channel closure.
    fn register_close_listener(&self, listener: CloseListener);

    /// Queues one outbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConnectionClosed`] if the channel is closed,
    /// or a connection error if the write cannot be queued.
    fn send(&self, frame: String) -> Result<()>;

    /// Returns `true` while the channel is open.
    fn is_connected(&self) -> bool;
}
