//! Engine and transport configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use bidi_engine::{EngineConfig, WebSocketOptions};
//!
//! let config = EngineConfig::new()
//!     .with_command_timeout(Duration::from_secs(10))
//!     .with_max_pending(256);
//!
//! let options = WebSocketOptions::new("ws://127.0.0.1:9222/session")?
//!     .with_connect_timeout(Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for `session.subscribe` / `session.unsubscribe`.
pub const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending commands before rejecting new ones.
pub const DEFAULT_MAX_PENDING: usize = 1000;

/// Buffered faults per fault-sink subscriber.
pub const DEFAULT_FAULT_CAPACITY: usize = 64;

/// Default timeout for establishing the WebSocket connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// EngineConfig
// ============================================================================

/// Tuning knobs for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline applied by `send` when no per-call timeout is given.
    pub command_timeout: Duration,
    /// Deadline for subscription transitions.
    pub subscribe_timeout: Duration,
    /// Maximum number of unresolved commands.
    pub max_pending: usize,
    /// Capacity of the fault broadcast channel.
    pub fault_capacity: usize,
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING,
            fault_capacity: DEFAULT_FAULT_CAPACITY,
        }
    }

    /// Sets the default command timeout.
    #[inline]
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the subscription transition timeout.
    #[inline]
    #[must_use]
    pub const fn with_subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    /// Sets the pending command limit.
    #[inline]
    #[must_use]
    pub const fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending = max;
        self
    }

    /// Sets the fault channel capacity.
    #[inline]
    #[must_use]
    pub const fn with_fault_capacity(mut self, capacity: usize) -> Self {
        self.fault_capacity = capacity;
        self
    }

    /// Checks that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero timeout, pending limit or
    /// fault capacity.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(Error::config("command_timeout must be non-zero"));
        }
        if self.subscribe_timeout.is_zero() {
            return Err(Error::config("subscribe_timeout must be non-zero"));
        }
        if self.max_pending == 0 {
            return Err(Error::config("max_pending must be at least 1"));
        }
        if self.fault_capacity == 0 {
            return Err(Error::config("fault_capacity must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// WebSocketOptions
// ============================================================================

/// Connection settings for [`WebSocketTransport`](crate::transport::WebSocketTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketOptions {
    /// Endpoint URL, `ws` or `wss`.
    url: Url,
    /// Handshake deadline.
    connect_timeout: Duration,
}

impl WebSocketOptions {
    /// Parses and validates the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL does not parse or its scheme
    /// is not `ws`/`wss`.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::config(format!("invalid URL '{url}': {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(Self {
                url,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            }),
            other => Err(Error::config(format!(
                "unsupported scheme '{other}', expected ws or wss"
            ))),
        }
    }

    /// Sets the handshake deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the handshake deadline.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

// ============================================================================
// Tests
// ============================================================================
