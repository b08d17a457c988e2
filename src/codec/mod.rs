//! Variant codec for tag-discriminated wire values.
//!
//! Every polymorphic wire object in the protocol carries a `type` string.
//! Each family of such objects is a closed Rust enum implementing
//! [`TaggedFamily`]; [`decode`] and [`encode`] are the single entry points
//! that map between the JSON wire shape and the typed variant.
//!
//! Decoding checks the discriminant against the family's table before
//! touching the rest of the object, so an unknown tag is reported as such
//! (with the family name) instead of as a generic shape mismatch. There is
//! no fallback variant in any family.
//!
//! # Families
//!
//! | Module | Families |
//! |--------|----------|
//! | `locator` | [`Locator`] |
//! | `remote_value` | [`RemoteValue`] |
//! | `script` | [`LocalValue`], [`EvaluateResult`], [`RealmInfo`] |
//! | `input` | [`SourceActions`], [`NoneSourceAction`], [`KeySourceAction`], [`PointerSourceAction`], [`WheelSourceAction`] |
//! | `network` | [`BytesValue`], [`UrlPattern`] |
//! | `log` | [`LogEntry`] |
//!
//! [`Origin`] is keyword-or-tagged (`"viewport"`, `"pointer"` or an
//! `element` object) and carries its own strict serde impls.

// ============================================================================
// Submodules
// ============================================================================

pub mod input;
pub mod locator;
pub mod log;
pub mod network;
pub mod remote_value;
pub mod script;

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Re-exports
// ============================================================================

pub use input::{
    KeySourceAction, KeySourceActions, NoneSourceAction, NoneSourceActions, Origin,
    PointerCommonProperties, PointerParameters, PointerSourceAction, PointerSourceActions,
    PointerType, SourceActions, WheelSourceAction, WheelSourceActions,
};
pub use locator::{AccessibilityQuery, ContextQuery, Locator, MatchType};
pub use log::{ConsoleLogEntry, JavascriptLogEntry, LogEntry, LogLevel, StackFrame, StackTrace};
pub use network::{BytesValue, Header, UrlPattern, UrlPatternFields};
pub use remote_value::{MappingEntry, MappingKey, NodeProperties, Number, RemoteValue};
pub use script::{
    EvaluateResult, ExceptionDetails, LocalValue, RealmInfo, RemoteObjectReference,
    RemoteReference, ResultOwnership, ScriptArgument, SharedReference, Source, Target,
};

// ============================================================================
// TaggedFamily
// ============================================================================

/// A closed set of wire shapes selected by their `type` field.
pub trait TaggedFamily: Serialize + DeserializeOwned {
    /// Family name used in decode errors.
    const FAMILY: &'static str;

    /// Every discriminant the family accepts.
    const TAGS: &'static [&'static str];

    /// Returns the discriminant of this variant.
    fn tag(&self) -> &'static str;
}

// ============================================================================
// Decode / Encode
// ============================================================================

/// Reads the `type` discriminant of a wire object.
///
/// # Errors
///
/// Returns [`Error::Decode`] if `value` is not an object or has no string
/// `type` field.
pub fn discriminant<'a>(family: &str, value: &'a Value) -> Result<&'a str> {
    let object = value.as_object().ok_or_else(|| {
        Error::decode(family, format!("expected object, found {}", kind_of(value)))
    })?;

    match object.get("type") {
        Some(Value::String(tag)) => Ok(tag),
        Some(other) => Err(Error::decode(
            family,
            format!("'type' must be a string, found {}", kind_of(other)),
        )),
        None => Err(Error::decode_missing_discriminant(family)),
    }
}

/// Decodes a wire object into a variant of family `F`.
///
/// # Errors
///
/// Returns [`Error::Decode`] when the discriminant is missing, is not one of
/// `F::TAGS`, or the object does not match the selected variant's shape.
pub fn decode<F: TaggedFamily>(value: &Value) -> Result<F> {
    let tag = discriminant(F::FAMILY, value)?;

    if !F::TAGS.contains(&tag) {
        return Err(Error::decode_unknown_variant(F::FAMILY, tag, F::TAGS));
    }

    <F as Deserialize>::deserialize(value)
        .map_err(|e| Error::decode(F::FAMILY, format!("variant '{tag}': {e}")))
}

/// Decodes a JSON text into a variant of family `F`.
///
/// # Errors
///
/// Returns [`Error::Decode`] for invalid JSON or any [`decode`] failure.
pub fn decode_str<F: TaggedFamily>(text: &str) -> Result<F> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::decode(F::FAMILY, e.to_string()))?;
    decode(&value)
}

/// Encodes a variant into its wire object.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode<F: TaggedFamily>(variant: &F) -> Result<Value> {
    Ok(serde_json::to_value(variant)?)
}

/// Decodes an untagged wire value into any serde type, reporting failures
/// as [`Error::Decode`] against `target`.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the value does not match `T`.
pub fn decode_as<T: DeserializeOwned>(target: &str, value: &Value) -> Result<T> {
    <T as Deserialize>::deserialize(value).map_err(|e| Error::decode(target, e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
