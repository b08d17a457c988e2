//! Network payload types.
//!
//! Request and response data carried by the `network.*` events, plus the
//! two tagged families used inside them: [`BytesValue`] for header and
//! cookie values, and [`UrlPattern`] for intercept filters.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::TaggedFamily;
use super::log::StackTrace;

// ============================================================================
// BytesValue
// ============================================================================

/// Header, cookie or body bytes, either as UTF-8 text or base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BytesValue {
    /// UTF-8 text.
    String {
        /// The text.
        value: String,
    },
    /// Base64-encoded binary data.
    Base64 {
        /// The encoded data.
        value: String,
    },
}

impl BytesValue {
    /// Creates a text value.
    #[inline]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
        }
    }

    /// Creates a base64 value by encoding `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Base64 {
            value: Base64Standard.encode(bytes),
        }
    }

    /// Returns the raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if a base64 value is not valid base64.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::String { value } => Ok(value.as_bytes().to_vec()),
            Self::Base64 { value } => Base64Standard
                .decode(value)
                .map_err(|e| Error::decode(Self::FAMILY, format!("invalid base64: {e}"))),
        }
    }

    /// Returns the text of a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String { value } => Some(value),
            Self::Base64 { .. } => None,
        }
    }
}

impl TaggedFamily for BytesValue {
    const FAMILY: &'static str = "BytesValue";
    const TAGS: &'static [&'static str] = &["string", "base64"];

    fn tag(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Base64 { .. } => "base64",
        }
    }
}

// ============================================================================
// UrlPattern
// ============================================================================

/// URL filter used by network intercepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UrlPattern {
    /// Component-wise pattern.
    Pattern(UrlPatternFields),
    /// Whole-URL pattern string.
    String {
        /// Pattern text.
        pattern: String,
    },
}

/// Components of a [`UrlPattern::Pattern`]. Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPatternFields {
    /// Scheme without the trailing colon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Host name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Port as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
    /// Query string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl UrlPattern {
    /// Creates a whole-URL pattern.
    #[inline]
    pub fn string(pattern: impl Into<String>) -> Self {
        Self::String {
            pattern: pattern.into(),
        }
    }

    /// Creates a pattern matching any URL on `hostname`.
    #[inline]
    pub fn host(hostname: impl Into<String>) -> Self {
        Self::Pattern(UrlPatternFields {
            hostname: Some(hostname.into()),
            ..UrlPatternFields::default()
        })
    }
}

impl TaggedFamily for UrlPattern {
    const FAMILY: &'static str = "UrlPattern";
    const TAGS: &'static [&'static str] = &["pattern", "string"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Pattern(_) => "pattern",
            Self::String { .. } => "string",
        }
    }
}

// ============================================================================
// Request / Response Data
// ============================================================================

/// HTTP header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: BytesValue,
}

/// Cookie as reported with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: BytesValue,
    /// Domain.
    pub domain: String,
    /// Path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// `HttpOnly` flag.
    pub http_only: bool,
    /// `Secure` flag.
    pub secure: bool,
    /// `SameSite` policy.
    pub same_site: String,
    /// Expiry, seconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

/// Request as seen by the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    /// Request id, stable across redirects.
    pub request: RequestId,
    /// Request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Request headers.
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Request cookies.
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    /// Size of the headers in bytes.
    #[serde(default)]
    pub headers_size: u64,
    /// Size of the body in bytes, if known.
    #[serde(default)]
    pub body_size: Option<u64>,
    /// Fetch destination, e.g. `document` or `script`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Initiator type, e.g. `fetch` or `img`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator_type: Option<String>,
}

/// Response as seen by the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Final response URL.
    pub url: String,
    /// Protocol, e.g. `http/1.1`.
    pub protocol: String,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// Served from cache.
    pub from_cache: bool,
    /// Response headers.
    #[serde(default)]
    pub headers: Vec<Header>,
    /// MIME type.
    pub mime_type: String,
    /// Bytes received over the network.
    pub bytes_received: u64,
    /// Size of the headers in bytes.
    #[serde(default)]
    pub headers_size: Option<u64>,
    /// Size of the body in bytes.
    #[serde(default)]
    pub body_size: Option<u64>,
}

/// What started a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    /// Initiator kind, e.g. `parser` or `script`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Column of the initiating call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
    /// Line of the initiating call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// Stack of the initiating call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    /// Request that triggered this one (preflight).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestId>,
}

/// Authentication challenge of a `network.authRequired` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    /// Scheme, e.g. `basic`.
    pub scheme: String,
    /// Protection realm.
    pub realm: String,
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
    fn test_bytes_value_string() {
        let value: BytesValue = decode(&json!({ "type": "string", "value": "text/html" }))
            .expect("decode");
        assert_eq!(value.as_str(), Some("text/html"));
        assert_eq!(value.to_bytes().expect("bytes"), b"text/html");
    }

    #[test]
    fn test_bytes_value_base64() {
        let value: BytesValue =
            decode(&json!({ "type": "base64", "value": "aGVsbG8=" })).expect("decode");
        assert_eq!(value.as_str(), None);
        assert_eq!(value.to_bytes().expect("bytes"), b"hello");
        assert_eq!(BytesValue::from_bytes(b"hello"), value);
    }

    #[test]
    fn test_bytes_value_invalid_base64() {
        let value = BytesValue::Base64 {
            value: "not base64!".to_string(),
        };
        assert!(value.to_bytes().expect_err("invalid").is_decode());
    }

    #[test]
    fn test_url_pattern_wire_shapes() {
        assert_eq!(
            encode(&UrlPattern::string("https://example.com/*")).expect("encode"),
            json!({ "type": "string", "pattern": "https://example.com/*" })
        );
        assert_eq!(
            encode(&UrlPattern::host("example.com")).expect("encode"),
            json!({ "type": "pattern", "hostname": "example.com" })
        );
    }

    #[test]
    fn test_url_pattern_unknown_type_fails() {
        let err = decode::<UrlPattern>(&json!({ "type": "regex", "pattern": ".*" }))
            .expect_err("unknown");
        assert!(err.to_string().contains("UrlPattern"));
    }

    #[test]
    fn test_request_data_tolerates_missing_optionals() {
        let request: RequestData = serde_json::from_value(json!({
            "request": "req-1",
            "url": "https://example.com/",
            "method": "GET",
            "headers": [{ "name": "accept", "value": { "type": "string", "value": "*/*" } }],
            "timings": {}
        }))
        .expect("decode");
        assert_eq!(request.request.as_str(), "req-1");
        assert_eq!(request.headers[0].value.as_str(), Some("*/*"));
        assert!(request.cookies.is_empty());
    }
}
