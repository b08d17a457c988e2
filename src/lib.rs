//! WebDriver BiDi protocol engine.
//!
//! This library implements the client half of the WebDriver BiDi protocol
//! on top of any full-duplex text channel.
//!
//! # Architecture
//!
//! The engine follows the protocol's local end / remote end model:
//!
//! - **Local End (Rust)**: Sends commands, receives responses and events
//! - **Remote End (Browser)**: Executes commands, emits events
//!
//! Key design principles:
//!
//! - One [`Engine`] per [`Transport`]; no global state
//! - Every command resolves exactly once: result, remote error, timeout or shutdown
//! - Local listeners share ref-counted remote subscriptions
//! - Every polymorphic wire value is a closed, `type`-tagged enum
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bidi_engine::protocol::SessionStatus;
//! use bidi_engine::{Engine, EngineConfig, EventKind, Result, Scope};
//! use bidi_engine::{WebSocketOptions, WebSocketTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = WebSocketOptions::new("ws://127.0.0.1:9222/session")?;
//!     let transport = Arc::new(WebSocketTransport::connect(&options).await?);
//!     let engine = Engine::new(transport, EngineConfig::default())?;
//!
//!     let status = engine.send(SessionStatus {}).await?;
//!     println!("Remote ready: {}", status.ready);
//!
//!     let _logs = engine
//!         .add_listener(EventKind::LogEntryAdded, Scope::Global, |envelope| {
//!             println!("{:?}", envelope.event);
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`codec`] | Tagged wire value families |
//! | [`config`] | Engine and transport configuration |
//! | [`engine`] | Correlation, subscriptions, routing |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Commands, events, frame envelopes |
//! | [`transport`] | Transport trait, WebSocket and in-memory transports |

// ============================================================================
// Modules
// ============================================================================

/// Tagged wire value families.
///
/// [`codec::decode`] and [`codec::encode`] map between JSON and the typed
/// variants of every family.
pub mod codec;

/// Engine and transport configuration.
pub mod config;

/// Command correlation, subscriptions and event routing.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// BiDi protocol message types.
pub mod protocol;

/// Transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use engine::{
    CommandHandle, Engine, EventContext, EventEnvelope, FaultKind, Listener, ProtocolFault, Scope,
    SubscriptionHandle,
};

// Configuration
pub use config::{EngineConfig, WebSocketOptions};

// Protocol types
pub use protocol::{BidiCommand, BidiEvent, EventKind};

// Codec entry points
pub use codec::{TaggedFamily, decode, encode};

// Transport types
pub use transport::{MemoryTransport, Transport, WebSocketTransport};

// Error types
pub use error::{Error, ErrorCode, Result};

// Identifier types
pub use identifiers::{
    BrowsingContextId, CommandId, ListenerId, RealmId, SubscriptionId, UserContextId,
};
