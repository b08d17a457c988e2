//! Inbound frame routing.
//!
//! Every text frame from the transport passes through [`Router::on_frame`]:
//!
//! | Frame | Route |
//! |-------|-------|
//! | not JSON, or a response/event of the wrong shape | fault sink |
//! | response with an `id` | correlator |
//! | error response without an `id` | fault sink |
//! | event with a registered method | decode, extract context, dispatch |
//! | event with an unknown method | dropped |
//! | anything else | dropped |
//!
//! Nothing here panics or waits; a failure on one frame never affects the
//! next.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::error::{Error, ErrorCode};
use crate::protocol::{BidiEvent, EventKind, EventMessage, Frame};

use super::context;
use super::correlator::Correlator;
use super::subscriptions::{EventEnvelope, SubscriptionManager};

// ============================================================================
// ProtocolFault
// ============================================================================

/// Category of a fault published on the fault sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Error response that carried no command id.
    Unsolicited,
    /// Frame that could not be parsed or classified.
    MalformedFrame,
    /// Event of a registered kind whose params failed to decode.
    EventDecode,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsolicited => "unsolicited",
            Self::MalformedFrame => "malformed-frame",
            Self::EventDecode => "event-decode",
        })
    }
}

/// A fault not tied to any pending command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFault {
    /// Fault category.
    pub kind: FaultKind,
    /// Event method, for decode faults.
    pub method: Option<String>,
    /// Remote error code, for unsolicited faults.
    pub code: Option<ErrorCode>,
    /// Human readable description.
    pub message: String,
}

impl ProtocolFault {
    fn from_error(kind: FaultKind, method: Option<String>, error: &Error) -> Self {
        Self {
            kind,
            method,
            code: error.remote_code(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ProtocolFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "[{}] {method}: {}", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Classifies inbound frames and hands them to their consumer.
pub(crate) struct Router {
    correlator: Arc<Correlator>,
    subscriptions: Arc<SubscriptionManager>,
    faults: broadcast::Sender<ProtocolFault>,
}

impl Router {
    pub(crate) fn new(
        correlator: Arc<Correlator>,
        subscriptions: Arc<SubscriptionManager>,
        faults: broadcast::Sender<ProtocolFault>,
    ) -> Self {
        Self {
            correlator,
            subscriptions,
            faults,
        }
    }

    /// Handles one inbound text frame.
    pub(crate) fn on_frame(&self, text: &str) {
        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping malformed frame");
                self.publish(ProtocolFault::from_error(FaultKind::MalformedFrame, None, &e));
                return;
            }
        };

        match frame {
            Frame::Response(response) => match response.id {
                Some(id) => self.correlator.resolve(id, response),
                None if response.is_error() => {
                    let fault = response.into_unsolicited();
                    warn!(error = %fault, "Unsolicited error response");
                    self.publish(ProtocolFault::from_error(FaultKind::Unsolicited, None, &fault));
                }
                None => debug!("Dropping success response without id"),
            },

            Frame::Event(event) => self.on_event(event),

            Frame::Unrecognized(_) => debug!(len = text.len(), "Dropping unrecognized frame"),
        }
    }

    fn on_event(&self, message: EventMessage) {
        let Some(kind) = EventKind::from_method(&message.method) else {
            debug!(method = %message.method, "Dropping unknown event");
            return;
        };

        let event = match BidiEvent::decode(kind, &message.params) {
            Ok(event) => event,
            Err(e) => {
                warn!(%kind, error = %e, "Failed to decode event");
                self.publish(ProtocolFault::from_error(
                    FaultKind::EventDecode,
                    Some(message.method),
                    &e,
                ));
                return;
            }
        };

        let envelope = EventEnvelope {
            kind,
            event,
            context: context::extract(kind, &message.params),
        };

        let delivered = self.subscriptions.dispatch(&envelope);
        trace!(%kind, delivered, "Event dispatched");
    }

    fn publish(&self, fault: ProtocolFault) {
        // No receivers is not an error
        let _ = self.faults.send(fault);
    }
}

// ============================================================================
// Tests
// ============================================================================
