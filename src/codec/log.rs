//! Log entries carried by `log.entryAdded`.

use serde::{Deserialize, Serialize};

use super::TaggedFamily;
use super::remote_value::RemoteValue;
use super::script::Source;

// ============================================================================
// LogEntry
// ============================================================================

/// A log entry, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    /// Output of a `console.*` call.
    Console(ConsoleLogEntry),
    /// Uncaught script error.
    Javascript(JavascriptLogEntry),
    /// Any other entry the remote end chooses to report.
    Generic(JavascriptLogEntry),
}

/// Entry produced by a `console` API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Realm and context that produced the entry.
    pub source: Source,
    /// Formatted text, if any.
    pub text: Option<String>,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    /// Call stack at the time of logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    /// Console method name, e.g. `log` or `warn`.
    pub method: String,
    /// Serialized call arguments.
    pub args: Vec<RemoteValue>,
}

/// Entry produced by an uncaught error, or a generic entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavascriptLogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Realm and context that produced the entry.
    pub source: Source,
    /// Error message, if any.
    pub text: Option<String>,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    /// Call stack of the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
}

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// Script call stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    /// Frames, innermost first.
    pub call_frames: Vec<StackFrame>,
}

/// One frame of a [`StackTrace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Zero-based column.
    pub column_number: u32,
    /// Function name, empty for top-level code.
    pub function_name: String,
    /// Zero-based line.
    pub line_number: u32,
    /// Script URL.
    pub url: String,
}

// ============================================================================
// Accessors
// ============================================================================

impl LogEntry {
    /// Returns the severity.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        match self {
            Self::Console(e) => e.level,
            Self::Javascript(e) | Self::Generic(e) => e.level,
        }
    }

    /// Returns the entry text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Console(e) => e.text.as_deref(),
            Self::Javascript(e) | Self::Generic(e) => e.text.as_deref(),
        }
    }

    /// Returns the producing realm and context.
    #[must_use]
    pub fn source(&self) -> &Source {
        match self {
            Self::Console(e) => &e.source,
            Self::Javascript(e) | Self::Generic(e) => &e.source,
        }
    }
}

impl TaggedFamily for LogEntry {
    const FAMILY: &'static str = "LogEntry";
    const TAGS: &'static [&'static str] = &["console", "javascript", "generic"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Console(_) => "console",
            Self::Javascript(_) => "javascript",
            Self::Generic(_) => "generic",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::{decode, encode};

    #[test]
    fn test_decode_console_entry() {
        let wire = json!({
            "type": "console",
            "level": "warn",
            "source": { "realm": "r-1", "context": "ctx-7" },
            "text": "careful",
            "timestamp": 1_700_000_000_000u64,
            "method": "warn",
            "args": [{ "type": "string", "value": "careful" }]
        });

        let entry: LogEntry = decode(&wire).expect("decode");
        assert_eq!(entry.level(), LogLevel::Warn);
        assert_eq!(entry.text(), Some("careful"));
        assert_eq!(
            entry.source().context.as_ref().map(|c| c.as_str()),
            Some("ctx-7")
        );
        let LogEntry::Console(console) = &entry else {
            panic!("expected console entry");
        };
        assert_eq!(console.args[0].as_str(), Some("careful"));
        assert_eq!(encode(&entry).expect("encode"), wire);
    }

    #[test]
    fn test_decode_javascript_entry_with_stack() {
        let entry: LogEntry = decode(&json!({
            "type": "javascript",
            "level": "error",
            "source": { "realm": "r-1" },
            "text": null,
            "timestamp": 5,
            "stackTrace": {
                "callFrames": [
                    { "columnNumber": 4, "functionName": "boom", "lineNumber": 10, "url": "https://example.com/app.js" }
                ]
            }
        }))
        .expect("decode");

        assert_eq!(entry.tag(), "javascript");
        assert_eq!(entry.text(), None);
        let LogEntry::Javascript(js) = entry else {
            panic!("expected javascript entry");
        };
        assert_eq!(js.stack_trace.expect("stack").call_frames[0].function_name, "boom");
    }

    #[test]
    fn test_decode_unknown_entry_type_fails() {
        let err = decode::<LogEntry>(&json!({
            "type": "violation",
            "level": "info",
            "source": { "realm": "r-1" },
            "text": "x",
            "timestamp": 0
        }))
        .expect_err("unknown type");
        assert!(err.to_string().contains("LogEntry"));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Error);
    }
}
