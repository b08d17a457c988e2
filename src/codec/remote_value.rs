//! Serialized script values returned by the remote end.
//!
//! A [`RemoteValue`] is the result of `script.evaluate`,
//! `script.callFunction`, `browsingContext.locateNodes` and the payload of
//! `script.message`. Containers (`array`, `object`, `map`, `set`, `node`
//! children) embed further remote values to any depth.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::identifiers::{BrowsingContextId, Handle, InternalId, SharedId};

use super::TaggedFamily;

// ============================================================================
// RemoteValue
// ============================================================================

/// A value serialized by the remote end, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// String primitive.
    String {
        /// The string.
        value: String,
    },
    /// Number primitive, including the non-finite specials.
    Number {
        /// The number.
        value: Number,
    },
    /// Boolean primitive.
    Boolean {
        /// The boolean.
        value: bool,
    },
    /// BigInt primitive in decimal string form.
    BigInt {
        /// Decimal digits.
        value: String,
    },
    /// Symbol.
    Symbol(ObjectInfo),
    /// Array.
    Array(CollectionInfo),
    /// Plain object.
    Object(MappingInfo),
    /// Function.
    Function(ObjectInfo),
    /// Regular expression.
    RegExp(RegExpInfo),
    /// Date.
    Date(DateInfo),
    /// Map.
    Map(MappingInfo),
    /// Set.
    Set(CollectionInfo),
    /// WeakMap.
    WeakMap(ObjectInfo),
    /// WeakSet.
    WeakSet(ObjectInfo),
    /// Generator.
    Generator(ObjectInfo),
    /// Error.
    Error(ObjectInfo),
    /// Proxy.
    Proxy(ObjectInfo),
    /// Promise.
    Promise(ObjectInfo),
    /// TypedArray.
    TypedArray(ObjectInfo),
    /// ArrayBuffer.
    ArrayBuffer(ObjectInfo),
    /// NodeList.
    NodeList(CollectionInfo),
    /// HTMLCollection.
    HtmlCollection(CollectionInfo),
    /// DOM node.
    Node(NodeInfo),
    /// Window proxy.
    Window(WindowInfo),
}

// ============================================================================
// Variant Payloads
// ============================================================================

/// Reference fields shared by every non-primitive remote value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    /// Handle in the owning realm, when ownership was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Cycle-detection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<InternalId>,
}

/// Array-like value with ordered children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    /// Handle in the owning realm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Cycle-detection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<InternalId>,
    /// Children; absent when serialization depth was exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<RemoteValue>>,
}

/// Keyed value (`object` or `map`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingInfo {
    /// Handle in the owning realm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Cycle-detection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<InternalId>,
    /// Entries; absent when serialization depth was exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<MappingEntry>>,
}

/// One `[key, value]` pair of a mapping. Serializes as a two-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry(pub MappingKey, pub RemoteValue);

/// Key of a mapping entry: a plain string property name or any remote value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingKey {
    /// Property name.
    String(String),
    /// Arbitrary key (maps only).
    Value(RemoteValue),
}

/// Regular expression value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegExpInfo {
    /// Handle in the owning realm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Cycle-detection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<InternalId>,
    /// Pattern and flags.
    pub value: RegExpValue,
}

/// Pattern and flags of a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegExpValue {
    /// Source pattern.
    pub pattern: String,
    /// Flags, e.g. `gi`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

/// Date value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateInfo {
    /// Handle in the owning realm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Cycle-detection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<InternalId>,
    /// ISO 8601 date string.
    pub value: String,
}

/// DOM node value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Cross-realm node id; use it to build a `SharedReference`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_id: Option<SharedId>,
    /// Handle in the owning realm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Cycle-detection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<InternalId>,
    /// Node properties; absent when serialization depth was exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<NodeProperties>,
}

/// Properties of a serialized DOM node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperties {
    /// DOM `nodeType`.
    pub node_type: u32,
    /// Number of child nodes.
    pub child_node_count: u32,
    /// Element attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
    /// Serialized children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RemoteValue>>,
    /// Local name of elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    /// Shadow root mode, `open` or `closed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Namespace URI.
    #[serde(rename = "namespaceURI", skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<String>,
    /// Node value of text-like nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_value: Option<String>,
    /// Attached shadow root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_root: Option<Box<RemoteValue>>,
}

/// Window proxy value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    /// Handle in the owning realm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// Cycle-detection id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<InternalId>,
    /// Browsing context of the window.
    pub value: WindowProxyProperties,
}

/// Properties of a window proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowProxyProperties {
    /// Browsing context id.
    pub context: BrowsingContextId,
}

// ============================================================================
// Number
// ============================================================================

/// A JavaScript number, including the values JSON cannot carry as numbers.
///
/// On the wire the specials are the strings `"NaN"`, `"-0"`, `"Infinity"`
/// and `"-Infinity"`. A `Finite` holding a special value is treated as that
/// special for encoding and equality.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Finite value other than negative zero.
    Finite(f64),
    /// Not-a-number.
    NaN,
    /// Negative zero.
    NegativeZero,
    /// Positive infinity.
    Infinity,
    /// Negative infinity.
    NegativeInfinity,
}

impl Number {
    /// Classifies an `f64`, routing specials to their own variants.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            Self::NaN
        } else if value == f64::INFINITY {
            Self::Infinity
        } else if value == f64::NEG_INFINITY {
            Self::NegativeInfinity
        } else if value == 0.0 && value.is_sign_negative() {
            Self::NegativeZero
        } else {
            Self::Finite(value)
        }
    }

    /// Returns the value as an `f64`.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Finite(v) => v,
            Self::NaN => f64::NAN,
            Self::NegativeZero => -0.0,
            Self::Infinity => f64::INFINITY,
            Self::NegativeInfinity => f64::NEG_INFINITY,
        }
    }

    /// Moves specials held in `Finite` to their own variants.
    #[inline]
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::from_f64(self.as_f64())
    }

    fn special_str(self) -> Option<&'static str> {
        match self.normalized() {
            Self::Finite(_) => None,
            Self::NaN => Some("NaN"),
            Self::NegativeZero => Some("-0"),
            Self::Infinity => Some("Infinity"),
            Self::NegativeInfinity => Some("-Infinity"),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.normalized(), other.normalized()) {
            (Self::Finite(a), Self::Finite(b)) => a == b,
            (a, b) => std::mem::discriminant(&a) == std::mem::discriminant(&b),
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.special_str() {
            Some(special) => serializer.serialize_str(special),
            None => serializer.serialize_f64(self.as_f64()),
        }
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumberVisitor;

        impl Visitor<'_> for NumberVisitor {
            type Value = Number;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or one of \"NaN\", \"-0\", \"Infinity\", \"-Infinity\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Number, E> {
                Ok(Number::Finite(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Number, E> {
                Ok(Number::Finite(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Number, E> {
                Ok(Number::from_f64(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Number, E> {
                match v {
                    "NaN" => Ok(Number::NaN),
                    "-0" => Ok(Number::NegativeZero),
                    "Infinity" => Ok(Number::Infinity),
                    "-Infinity" => Ok(Number::NegativeInfinity),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl RemoteValue {
    /// Creates a string value.
    #[inline]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
        }
    }

    /// Creates a number value.
    #[inline]
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number {
            value: Number::from_f64(value),
        }
    }

    /// Returns the wire discriminant.
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.tag()
    }

    /// Returns the string if this is a string primitive.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String { value } => Some(value),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean primitive.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean { value } => Some(*value),
            _ => None,
        }
    }

    /// Returns the number if this is a number primitive.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number { value } => Some(value.as_f64()),
            _ => None,
        }
    }

    /// Returns the realm handle of a non-primitive value.
    #[must_use]
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Self::Symbol(o)
            | Self::Function(o)
            | Self::WeakMap(o)
            | Self::WeakSet(o)
            | Self::Generator(o)
            | Self::Error(o)
            | Self::Proxy(o)
            | Self::Promise(o)
            | Self::TypedArray(o)
            | Self::ArrayBuffer(o) => o.handle.as_ref(),
            Self::Array(c) | Self::Set(c) | Self::NodeList(c) | Self::HtmlCollection(c) => {
                c.handle.as_ref()
            }
            Self::Object(m) | Self::Map(m) => m.handle.as_ref(),
            Self::RegExp(r) => r.handle.as_ref(),
            Self::Date(d) => d.handle.as_ref(),
            Self::Node(n) => n.handle.as_ref(),
            Self::Window(w) => w.handle.as_ref(),
            _ => None,
        }
    }

    /// Returns the shared id of a node value.
    #[must_use]
    pub fn shared_id(&self) -> Option<&SharedId> {
        match self {
            Self::Node(n) => n.shared_id.as_ref(),
            _ => None,
        }
    }

    /// Returns the children of an array-like value.
    #[must_use]
    pub fn items(&self) -> Option<&[RemoteValue]> {
        match self {
            Self::Array(c) | Self::Set(c) | Self::NodeList(c) | Self::HtmlCollection(c) => {
                c.value.as_deref()
            }
            _ => None,
        }
    }

    /// Looks up a string-keyed property of an `object` or `map` value.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&RemoteValue> {
        let entries = match self {
            Self::Object(m) | Self::Map(m) => m.value.as_deref()?,
            _ => return None,
        };

        entries.iter().find_map(|MappingEntry(key, value)| match key {
            MappingKey::String(k) if k == name => Some(value),
            MappingKey::Value(RemoteValue::String { value: k }) if k == name => Some(value),
            _ => None,
        })
    }
}

// ============================================================================
// TaggedFamily
// ============================================================================

impl TaggedFamily for RemoteValue {
    const FAMILY: &'static str = "RemoteValue";
    const TAGS: &'static [&'static str] = &[
        "undefined",
        "null",
        "string",
        "number",
        "boolean",
        "bigint",
        "symbol",
        "array",
        "object",
        "function",
        "regexp",
        "date",
        "map",
        "set",
        "weakmap",
        "weakset",
        "generator",
        "error",
        "proxy",
        "promise",
        "typedarray",
        "arraybuffer",
        "nodelist",
        "htmlcollection",
        "node",
        "window",
    ];

    fn tag(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Boolean { .. } => "boolean",
            Self::BigInt { .. } => "bigint",
            Self::Symbol(_) => "symbol",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::RegExp(_) => "regexp",
            Self::Date(_) => "date",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::WeakMap(_) => "weakmap",
            Self::WeakSet(_) => "weakset",
            Self::Generator(_) => "generator",
            Self::Error(_) => "error",
            Self::Proxy(_) => "proxy",
            Self::Promise(_) => "promise",
            Self::TypedArray(_) => "typedarray",
            Self::ArrayBuffer(_) => "arraybuffer",
            Self::NodeList(_) => "nodelist",
            Self::HtmlCollection(_) => "htmlcollection",
            Self::Node(_) => "node",
            Self::Window(_) => "window",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
