//! Wire message envelopes.
//!
//! Outbound commands and the classification of inbound frames into
//! responses and events.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

// ============================================================================
// Request
// ============================================================================

/// A command request from the local end to the remote end.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "module.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a, P: Serialize + ?Sized> {
    /// Correlation id assigned by the engine.
    pub id: CommandId,

    /// Command name in `module.methodName` format.
    pub method: &'a str,

    /// Command parameters.
    pub params: &'a P,
}

impl<'a, P: Serialize + ?Sized> Request<'a, P> {
    /// Creates a request.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, method: &'a str, params: &'a P) -> Self {
        Self { id, method, params }
    }

    /// Serializes the request into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the params fail to serialize.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the remote end.
///
/// Success:
/// ```json
/// { "type": "success", "id": 1, "result": { ... } }
/// ```
///
/// Error (`id` is `null` for faults not tied to a command):
/// ```json
/// { "type": "error", "id": 1, "error": "no such element", "message": "...", "stacktrace": "..." }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the command `id`; absent for unsolicited faults.
    #[serde(default)]
    pub id: Option<CommandId>,

    /// Response type.
    #[serde(rename = "type", default)]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default)]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default)]
    pub message: Option<String>,

    /// Remote stack trace (if error).
    #[serde(default)]
    pub stacktrace: Option<String>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error || self.error.is_some()
    }

    /// Converts the response into its result value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if the response was an error.
    pub fn into_result(self) -> Result<Value> {
        if self.is_error() {
            let error = self.error.unwrap_or_else(|| "unknown error".to_string());
            let message = self.message.unwrap_or_else(|| error.clone());
            return Err(Error::remote(error, message, self.stacktrace));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }

    /// Converts an error response into an unsolicited fault.
    #[must_use]
    pub fn into_unsolicited(self) -> Error {
        let error = self.error.unwrap_or_else(|| "unknown error".to_string());
        let message = self.message.unwrap_or_else(|| error.clone());
        Error::unsolicited(error, message)
    }
}

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    #[default]
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// EventMessage
// ============================================================================

/// An event notification from the remote end.
///
/// ```json
/// { "type": "event", "method": "module.eventName", "params": { ... } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl EventMessage {
    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }
}

// ============================================================================
// Frame
// ============================================================================

/// Classified inbound text frame.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Command response or protocol fault.
    Response(Response),
    /// Asynchronous event.
    Event(EventMessage),
    /// Valid JSON of no recognised shape.
    Unrecognized(Value),
}

impl Frame {
    /// Parses and classifies a text frame.
    ///
    /// A frame with an `id` key or `"type": "error"` is a response; one with
    /// a `method` key is an event; anything else is unrecognised.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text is not JSON or a
    /// response/event has the wrong field types.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::malformed_frame(e.to_string()))?;

        let Some(object) = value.as_object() else {
            return Ok(Self::Unrecognized(value));
        };

        let is_error = object.get("type").and_then(Value::as_str) == Some("error");

        if object.contains_key("id") || is_error {
            let response = Response::deserialize(&value)
                .map_err(|e| Error::malformed_frame(format!("response: {e}")))?;
            return Ok(Self::Response(response));
        }

        if object.contains_key("method") {
            let event = EventMessage::deserialize(&value)
                .map_err(|e| Error::malformed_frame(format!("event: {e}")))?;
            return Ok(Self::Event(event));
        }

        Ok(Self::Unrecognized(value))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_serialization() {
        let params = json!({ "context": "ctx-1", "url": "https://example.com" });
        let request = Request::new(CommandId::new(3), "browsingContext.navigate", &params);
        let frame = request.to_frame().expect("serialize");
        let back: Value = serde_json::from_str(&frame).expect("json");

        assert_eq!(
            back,
            json!({
                "id": 3,
                "method": "browsingContext.navigate",
                "params": { "context": "ctx-1", "url": "https://example.com" }
            })
        );
    }

    #[test]
    fn test_parse_success_response() {
        let frame = Frame::parse(r#"{"type":"success","id":1,"result":{"ready":true}}"#)
            .expect("parse");
        let Frame::Response(response) = frame else {
            panic!("expected response");
        };
        assert_eq!(response.id, Some(CommandId::new(1)));
        assert!(!response.is_error());
        assert_eq!(response.into_result().expect("ok")["ready"], json!(true));
    }

    #[test]
    fn test_parse_error_response() {
        let frame = Frame::parse(
            r#"{"type":"error","id":2,"error":"no such element","message":"gone","stacktrace":"at x"}"#,
        )
        .expect("parse");
        let Frame::Response(response) = frame else {
            panic!("expected response");
        };
        let err = response.into_result().expect_err("error");
        assert!(err.is_remote());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_unsolicited_fault() {
        let frame = Frame::parse(r#"{"type":"error","id":null,"error":"invalid argument","message":"bad"}"#)
            .expect("parse");
        let Frame::Response(response) = frame else {
            panic!("expected response");
        };
        assert!(response.id.is_none());
        let fault = response.into_unsolicited();
        assert!(matches!(fault, Error::Unsolicited { .. }));
    }

    #[test]
    fn test_parse_event() {
        let frame = Frame::parse(
            r#"{"type":"event","method":"browsingContext.load","params":{"context":"ctx-1"}}"#,
        )
        .expect("parse");
        let Frame::Event(event) = frame else {
            panic!("expected event");
        };
        assert_eq!(event.module(), "browsingContext");
        assert_eq!(event.params["context"], json!("ctx-1"));
    }

    #[test]
    fn test_parse_malformed() {
        let err = Frame::parse("{not json").expect_err("malformed");
        assert!(matches!(err, Error::MalformedFrame { .. }));
    }

    #[test]
    fn test_parse_bad_id_type_is_malformed() {
        let err = Frame::parse(r#"{"type":"success","id":"abc","result":{}}"#).expect_err("bad id");
        assert!(matches!(err, Error::MalformedFrame { .. }));
    }

    #[test]
    fn test_parse_unrecognized() {
        assert!(matches!(
            Frame::parse(r#"{"hello":"world"}"#).expect("parse"),
            Frame::Unrecognized(_)
        ));
        assert!(matches!(Frame::parse("[1,2]").expect("parse"), Frame::Unrecognized(_)));
    }
}
