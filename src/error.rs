//! Error types for the BiDi engine.
//!
//! This module defines every fault the engine can surface. Protocol faults
//! are kept apart from ambient (configuration, transport, serialization)
//! faults so callers can branch on kind instead of parsing messages.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use bidi_engine::{Error, ErrorCode, Result};
//!
//! async fn example(engine: &Engine) -> Result<()> {
//!     match engine.send(locate).await {
//!         Err(e) if e.remote_code() == Some(ErrorCode::NoSuchNode) => Ok(()),
//!         other => other.map(|_| ()),
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::TooManyPending`] |
//! | Protocol | [`Error::Decode`], [`Error::Remote`], [`Error::Unsolicited`], [`Error::MalformedFrame`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when engine or transport configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport failed to connect or to write a frame.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Channel closed while the operation was outstanding.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Pending command limit reached.
    #[error("Too many pending commands: {pending}/{max}")]
    TooManyPending {
        /// Commands currently awaiting a response.
        pending: usize,
        /// Configured limit.
        max: usize,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A wire value could not be mapped to its typed form.
    ///
    /// Raised for missing or unknown discriminants and for malformed shapes.
    #[error("Decode error in {family}: {message}")]
    Decode {
        /// Variant family or target type being decoded.
        family: String,
        /// What went wrong.
        message: String,
    },

    /// Error response correlated to a command.
    #[error("Remote error ({error}): {message}")]
    Remote {
        /// Error code string as sent on the wire.
        error: String,
        /// Human readable message.
        message: String,
        /// Remote stacktrace, when provided.
        stacktrace: Option<String>,
    },

    /// Error response that carried no command id.
    #[error("Unsolicited error ({error}): {message}")]
    Unsolicited {
        /// Error code string as sent on the wire.
        error: String,
        /// Human readable message.
        message: String,
    },

    /// Inbound frame that is not JSON or not a known message shape.
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Description of the problem.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No response arrived before the engine deadline.
    #[error("Command {command_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The command that timed out.
        command_id: CommandId,
        /// Command method.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a decode error for a family with a free-form message.
    #[inline]
    pub fn decode(family: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            family: family.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error for a value without a `type` field.
    #[inline]
    pub fn decode_missing_discriminant(family: &str) -> Self {
        Self::decode(family, "missing 'type' discriminant")
    }

    /// Creates a decode error for a discriminant outside the family.
    #[inline]
    pub fn decode_unknown_variant(family: &str, discriminant: &str, expected: &[&str]) -> Self {
        Self::decode(
            family,
            format!(
                "unknown discriminant '{discriminant}', expected one of: {}",
                expected.join(", ")
            ),
        )
    }

    /// Creates a remote error from wire fields.
    #[inline]
    pub fn remote(
        error: impl Into<String>,
        message: impl Into<String>,
        stacktrace: Option<String>,
    ) -> Self {
        Self::Remote {
            error: error.into(),
            message: message.into(),
            stacktrace,
        }
    }

    /// Creates an unsolicited error from wire fields.
    #[inline]
    pub fn unsolicited(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unsolicited {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(command_id: CommandId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            command_id,
            method: method.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this error came back from the remote end.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Unsolicited { .. })
    }

    /// Returns `true` if a wire value failed to decode.
    #[inline]
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns the parsed remote error code, if this is a remote error.
    #[must_use]
    pub fn remote_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Remote { error, .. } | Self::Unsolicited { error, .. } => {
                Some(ErrorCode::from_wire(error))
            }
            _ => None,
        }
    }

    /// Returns `true` if the remote end reported an expected negative outcome.
    ///
    /// These are lookups that found nothing rather than misuse of the protocol.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.remote_code().is_some_and(ErrorCode::is_not_found)
    }
}

// ============================================================================
// ErrorCode
// ============================================================================

/// Error codes defined by the BiDi protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `invalid argument`
    InvalidArgument,
    /// `invalid selector`
    InvalidSelector,
    /// `invalid session id`
    InvalidSessionId,
    /// `move target out of bounds`
    MoveTargetOutOfBounds,
    /// `no such alert`
    NoSuchAlert,
    /// `no such element`
    NoSuchElement,
    /// `no such frame`
    NoSuchFrame,
    /// `no such handle`
    NoSuchHandle,
    /// `no such history entry`
    NoSuchHistoryEntry,
    /// `no such intercept`
    NoSuchIntercept,
    /// `no such node`
    NoSuchNode,
    /// `no such request`
    NoSuchRequest,
    /// `no such script`
    NoSuchScript,
    /// `no such user context`
    NoSuchUserContext,
    /// `session not created`
    SessionNotCreated,
    /// `unable to capture screen`
    UnableToCaptureScreen,
    /// `unable to close browser`
    UnableToCloseBrowser,
    /// `unknown command`
    UnknownCommand,
    /// `unsupported operation`
    UnsupportedOperation,
    /// `unknown error` or any code outside this list.
    Unknown,
}

impl ErrorCode {
    /// Parses a wire error code. Unrecognized codes map to [`ErrorCode::Unknown`].
    #[must_use]
    pub fn from_wire(code: &str) -> Self {
        match code {
            "invalid argument" => Self::InvalidArgument,
            "invalid selector" => Self::InvalidSelector,
            "invalid session id" => Self::InvalidSessionId,
            "move target out of bounds" => Self::MoveTargetOutOfBounds,
            "no such alert" => Self::NoSuchAlert,
            "no such element" => Self::NoSuchElement,
            "no such frame" => Self::NoSuchFrame,
            "no such handle" => Self::NoSuchHandle,
            "no such history entry" => Self::NoSuchHistoryEntry,
            "no such intercept" => Self::NoSuchIntercept,
            "no such node" => Self::NoSuchNode,
            "no such request" => Self::NoSuchRequest,
            "no such script" => Self::NoSuchScript,
            "no such user context" => Self::NoSuchUserContext,
            "session not created" => Self::SessionNotCreated,
            "unable to capture screen" => Self::UnableToCaptureScreen,
            "unable to close browser" => Self::UnableToCloseBrowser,
            "unknown command" => Self::UnknownCommand,
            "unsupported operation" => Self::UnsupportedOperation,
            _ => Self::Unknown,
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::InvalidSelector => "invalid selector",
            Self::InvalidSessionId => "invalid session id",
            Self::MoveTargetOutOfBounds => "move target out of bounds",
            Self::NoSuchAlert => "no such alert",
            Self::NoSuchElement => "no such element",
            Self::NoSuchFrame => "no such frame",
            Self::NoSuchHandle => "no such handle",
            Self::NoSuchHistoryEntry => "no such history entry",
            Self::NoSuchIntercept => "no such intercept",
            Self::NoSuchNode => "no such node",
            Self::NoSuchRequest => "no such request",
            Self::NoSuchScript => "no such script",
            Self::NoSuchUserContext => "no such user context",
            Self::SessionNotCreated => "session not created",
            Self::UnableToCaptureScreen => "unable to capture screen",
            Self::UnableToCloseBrowser => "unable to close browser",
            Self::UnknownCommand => "unknown command",
            Self::UnsupportedOperation => "unsupported operation",
            Self::Unknown => "unknown error",
        }
    }

    /// Returns `true` for codes that report a missing target.
    #[inline]
    #[must_use]
    pub fn is_not_found(self) -> bool {
        matches!(
            self,
            Self::NoSuchAlert
                | Self::NoSuchElement
                | Self::NoSuchFrame
                | Self::NoSuchHandle
                | Self::NoSuchHistoryEntry
                | Self::NoSuchIntercept
                | Self::NoSuchNode
                | Self::NoSuchRequest
                | Self::NoSuchScript
                | Self::NoSuchUserContext
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
