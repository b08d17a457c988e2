//! BiDi wire protocol message types.
//!
//! This module defines the messages exchanged between the local end (this
//! crate) and the remote end (the browser).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request |
//! | `Response` | Remote → Local | Command result or fault |
//! | `EventMessage` | Remote → Local | Asynchronous notification |
//!
//! # Command Naming
//!
//! Commands and events follow `module.methodName` format:
//!
//! - `session.subscribe`
//! - `browsingContext.locateNodes`
//! - `log.entryAdded`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed commands and their results |
//! | `event` | Event registry and typed payloads |
//! | `message` | Request, Response and frame classification |

// ============================================================================
// Submodules
// ============================================================================

/// Typed command definitions.
pub mod command;

/// Event registry and payloads.
pub mod event;

/// Request, Response and frame types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    BidiCommand, BrowsingContextInfo, CallFunction, EmptyResult, Evaluate, GetTree, GetTreeResult,
    LocateNodes, LocateNodesResult, Navigate, NavigateResult, PerformActions, ReadinessState,
    ReleaseActions, SessionStatus, StatusResult, Subscribe, SubscribeResult, Unsubscribe,
};
pub use event::{BidiEvent, EventDecoder, EventKind};
pub use message::{EventMessage, Frame, Request, Response, ResponseType};
