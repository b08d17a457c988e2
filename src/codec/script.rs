//! Script module types: values sent to the page, references to remote
//! objects, evaluation results and realm descriptions.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::{BrowsingContextId, Handle, RealmId, SharedId};

use super::TaggedFamily;
use super::log::StackTrace;
use super::remote_value::{Number, RegExpValue, RemoteValue};

// ============================================================================
// LocalValue
// ============================================================================

/// A value constructed by the client and deserialized in the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocalValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// String primitive.
    String {
        /// The string.
        value: String,
    },
    /// Number primitive.
    Number {
        /// The number.
        value: Number,
    },
    /// Boolean primitive.
    Boolean {
        /// The boolean.
        value: bool,
    },
    /// BigInt in decimal string form.
    BigInt {
        /// Decimal digits.
        value: String,
    },
    /// Array of values or references.
    Array {
        /// Elements.
        value: Vec<ScriptArgument>,
    },
    /// Date from an ISO 8601 string.
    Date {
        /// Date string.
        value: String,
    },
    /// Map with arbitrary keys.
    Map {
        /// Entries.
        value: Vec<LocalMappingEntry>,
    },
    /// Plain object.
    Object {
        /// Entries.
        value: Vec<LocalMappingEntry>,
    },
    /// Regular expression.
    RegExp {
        /// Pattern and flags.
        value: RegExpValue,
    },
    /// Set.
    Set {
        /// Elements.
        value: Vec<ScriptArgument>,
    },
    /// Channel whose messages arrive as `script.message` events.
    Channel {
        /// Channel properties.
        value: ChannelProperties,
    },
}

/// One `[key, value]` pair of a local map or object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMappingEntry(pub LocalMappingKey, pub ScriptArgument);

/// Key of a local mapping entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalMappingKey {
    /// Property name.
    String(String),
    /// Arbitrary key (maps only).
    Value(ScriptArgument),
}

/// Channel configuration for a [`LocalValue::Channel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProperties {
    /// Channel id echoed back in `script.message`.
    pub channel: String,
    /// Serialization of posted messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    /// Ownership of posted messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<ResultOwnership>,
}

impl LocalValue {
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

    /// Creates a boolean value.
    #[inline]
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Boolean { value }
    }

    /// Creates a channel value.
    #[inline]
    pub fn channel(id: impl Into<String>) -> Self {
        Self::Channel {
            value: ChannelProperties {
                channel: id.into(),
                serialization_options: None,
                ownership: None,
            },
        }
    }
}

impl TaggedFamily for LocalValue {
    const FAMILY: &'static str = "LocalValue";
    const TAGS: &'static [&'static str] = &[
        "undefined",
        "null",
        "string",
        "number",
        "boolean",
        "bigint",
        "array",
        "date",
        "map",
        "object",
        "regexp",
        "set",
        "channel",
    ];

    fn tag(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Boolean { .. } => "boolean",
            Self::BigInt { .. } => "bigint",
            Self::Array { .. } => "array",
            Self::Date { .. } => "date",
            Self::Map { .. } => "map",
            Self::Object { .. } => "object",
            Self::RegExp { .. } => "regexp",
            Self::Set { .. } => "set",
            Self::Channel { .. } => "channel",
        }
    }
}

// ============================================================================
// References
// ============================================================================

/// Argument passed to `script.callFunction`: a value or a reference.
///
/// References carry no `type` field, so the two shapes are told apart by
/// their keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptArgument {
    /// Value built in the page.
    Value(LocalValue),
    /// Existing remote object.
    Reference(RemoteReference),
}

impl From<LocalValue> for ScriptArgument {
    fn from(value: LocalValue) -> Self {
        Self::Value(value)
    }
}

impl From<RemoteReference> for ScriptArgument {
    fn from(reference: RemoteReference) -> Self {
        Self::Reference(reference)
    }
}

impl From<SharedReference> for ScriptArgument {
    fn from(reference: SharedReference) -> Self {
        Self::Reference(RemoteReference::Shared(reference))
    }
}

/// Reference to an object living in the page.
///
/// Any reference carrying a `sharedId` is [`RemoteReference::Shared`], with
/// or without a handle. [`RemoteReference::Object`] holds a handle alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteReference {
    /// Node reference by shared id.
    Shared(SharedReference),
    /// Object reference by realm handle.
    Object(RemoteObjectReference),
}

impl RemoteReference {
    /// Creates an object reference from a realm handle.
    #[inline]
    pub fn handle(handle: impl Into<Handle>) -> Self {
        Self::Object(RemoteObjectReference {
            handle: handle.into(),
        })
    }
}

/// Reference to a DOM node by shared id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedReference {
    /// Shared id of the node.
    pub shared_id: SharedId,
    /// Realm handle, if one is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
}

impl SharedReference {
    /// Creates a reference from a shared id.
    #[inline]
    pub fn new(shared_id: impl Into<SharedId>) -> Self {
        Self {
            shared_id: shared_id.into(),
            handle: None,
        }
    }

    /// Builds a reference from a `node` remote value.
    #[must_use]
    pub fn from_node(value: &RemoteValue) -> Option<Self> {
        let shared_id = value.shared_id()?.clone();
        Some(Self {
            shared_id,
            handle: value.handle().cloned(),
        })
    }
}

/// Reference to a remote object by realm handle.
///
/// Nodes that also have a shared id go through [`SharedReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectReference {
    /// Realm handle.
    pub handle: Handle,
}

// ============================================================================
// Evaluation
// ============================================================================

/// Result of `script.evaluate` and `script.callFunction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EvaluateResult {
    /// Script completed normally.
    Success {
        /// Returned value.
        result: RemoteValue,
        /// Realm the script ran in.
        realm: RealmId,
    },
    /// Script threw.
    Exception {
        /// Thrown value and location.
        #[serde(rename = "exceptionDetails")]
        exception_details: ExceptionDetails,
        /// Realm the script ran in.
        realm: RealmId,
    },
}

impl EvaluateResult {
    /// Returns the value of a successful evaluation.
    #[must_use]
    pub fn value(&self) -> Option<&RemoteValue> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Exception { .. } => None,
        }
    }

    /// Returns the realm the script ran in.
    #[must_use]
    pub fn realm(&self) -> &RealmId {
        match self {
            Self::Success { realm, .. } | Self::Exception { realm, .. } => realm,
        }
    }

    /// Returns `true` if the script threw.
    #[inline]
    #[must_use]
    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }
}

impl TaggedFamily for EvaluateResult {
    const FAMILY: &'static str = "EvaluateResult";
    const TAGS: &'static [&'static str] = &["success", "exception"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Exception { .. } => "exception",
        }
    }
}

/// Details of a thrown exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Zero-based column.
    pub column_number: u32,
    /// Thrown value.
    pub exception: RemoteValue,
    /// Zero-based line.
    pub line_number: u32,
    /// Stack at the throw site.
    pub stack_trace: StackTrace,
    /// Exception message.
    pub text: String,
}

/// Where a script runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// A realm by id.
    Realm {
        /// Realm id.
        realm: RealmId,
    },
    /// The window realm of a browsing context, optionally in a sandbox.
    Context {
        /// Browsing context.
        context: BrowsingContextId,
        /// Sandbox name.
        #[serde(skip_serializing_if = "Option::is_none")]
        sandbox: Option<String>,
    },
}

impl Target {
    /// Targets the main realm of a browsing context.
    #[inline]
    pub fn context(context: impl Into<BrowsingContextId>) -> Self {
        Self::Context {
            context: context.into(),
            sandbox: None,
        }
    }

    /// Targets a realm.
    #[inline]
    pub fn realm(realm: impl Into<RealmId>) -> Self {
        Self::Realm {
            realm: realm.into(),
        }
    }
}

/// Whether the remote end keeps a handle to returned objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOwnership {
    /// Keep a handle.
    Root,
    /// Do not keep a handle.
    #[default]
    None,
}

/// Limits applied when serializing results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializationOptions {
    /// Maximum DOM depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dom_depth: Option<u32>,
    /// Maximum object depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_object_depth: Option<u32>,
    /// Shadow trees to include: `none`, `open` or `all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_shadow_tree: Option<String>,
}

/// Realm and optional browsing context that produced a value or entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Realm id.
    pub realm: RealmId,
    /// Browsing context, for window realms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BrowsingContextId>,
}

// ============================================================================
// RealmInfo
// ============================================================================

/// Description of a script realm, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RealmInfo {
    /// Window realm of a browsing context.
    Window(WindowRealmInfo),
    /// Dedicated worker.
    DedicatedWorker(DedicatedWorkerRealmInfo),
    /// Shared worker.
    SharedWorker(BaseRealmInfo),
    /// Service worker.
    ServiceWorker(BaseRealmInfo),
    /// Generic worker.
    Worker(BaseRealmInfo),
    /// Paint worklet.
    PaintWorklet(BaseRealmInfo),
    /// Audio worklet.
    AudioWorklet(BaseRealmInfo),
    /// Generic worklet.
    Worklet(BaseRealmInfo),
}

/// Fields common to every realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRealmInfo {
    /// Realm id.
    pub realm: RealmId,
    /// Serialized origin.
    pub origin: String,
}

/// Window realm fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRealmInfo {
    /// Realm id.
    pub realm: RealmId,
    /// Serialized origin.
    pub origin: String,
    /// Owning browsing context.
    pub context: BrowsingContextId,
    /// Sandbox name, for sandboxed realms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

/// Dedicated worker realm fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedicatedWorkerRealmInfo {
    /// Realm id.
    pub realm: RealmId,
    /// Serialized origin.
    pub origin: String,
    /// Realms that own the worker.
    pub owners: Vec<RealmId>,
}

impl RealmInfo {
    /// Returns the realm id.
    #[must_use]
    pub fn realm(&self) -> &RealmId {
        match self {
            Self::Window(w) => &w.realm,
            Self::DedicatedWorker(w) => &w.realm,
            Self::SharedWorker(b)
            | Self::ServiceWorker(b)
            | Self::Worker(b)
            | Self::PaintWorklet(b)
            | Self::AudioWorklet(b)
            | Self::Worklet(b) => &b.realm,
        }
    }

    /// Returns the browsing context of a window realm.
    #[must_use]
    pub fn context(&self) -> Option<&BrowsingContextId> {
        match self {
            Self::Window(w) => Some(&w.context),
            _ => None,
        }
    }
}

impl TaggedFamily for RealmInfo {
    const FAMILY: &'static str = "RealmInfo";
    const TAGS: &'static [&'static str] = &[
        "window",
        "dedicated-worker",
        "shared-worker",
        "service-worker",
        "worker",
        "paint-worklet",
        "audio-worklet",
        "worklet",
    ];

    fn tag(&self) -> &'static str {
        match self {
            Self::Window(_) => "window",
            Self::DedicatedWorker(_) => "dedicated-worker",
            Self::SharedWorker(_) => "shared-worker",
            Self::ServiceWorker(_) => "service-worker",
            Self::Worker(_) => "worker",
            Self::PaintWorklet(_) => "paint-worklet",
            Self::AudioWorklet(_) => "audio-worklet",
            Self::Worklet(_) => "worklet",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::codec::{decode, encode};

    #[test]
    fn test_local_value_array_with_reference() {
        let value = LocalValue::Array {
            value: vec![
                LocalValue::string("a").into(),
                SharedReference::new("node-1").into(),
            ],
        };
        let wire = encode(&value).expect("encode");
        assert_eq!(
            wire,
            json!({
                "type": "array",
                "value": [
                    { "type": "string", "value": "a" },
                    { "sharedId": "node-1" }
                ]
            })
        );
        assert_eq!(decode::<LocalValue>(&wire).expect("decode"), value);
    }

    #[test]
    fn test_local_value_object_entries() {
        let value = LocalValue::Object {
            value: vec![LocalMappingEntry(
                LocalMappingKey::String("n".to_string()),
                LocalValue::number(1.5).into(),
            )],
        };
        let wire = encode(&value).expect("encode");
        assert_eq!(
            wire,
            json!({ "type": "object", "value": [["n", { "type": "number", "value": 1.5 }]] })
        );
        assert_eq!(decode::<LocalValue>(&wire).expect("decode"), value);
    }

    #[test]
    fn test_local_value_channel() {
        let wire = encode(&LocalValue::channel("events")).expect("encode");
        assert_eq!(wire, json!({ "type": "channel", "value": { "channel": "events" } }));
    }

    #[test]
    fn test_local_value_unknown_type_fails() {
        let err = decode::<LocalValue>(&json!({ "type": "symbol" })).expect_err("unknown");
        assert!(err.to_string().contains("LocalValue"));
    }

    #[test]
    fn test_remote_reference_shapes() {
        let shared: RemoteReference =
            serde_json::from_value(json!({ "sharedId": "n-1" })).expect("shared");
        assert!(matches!(shared, RemoteReference::Shared(_)));

        let object: RemoteReference =
            serde_json::from_value(json!({ "handle": "h-1" })).expect("object");
        assert_eq!(object, RemoteReference::handle("h-1"));
    }

    #[test]
    fn test_reference_with_shared_id_and_handle_is_shared() {
        let reference = RemoteReference::Shared(SharedReference {
            shared_id: SharedId::new("s-1"),
            handle: Some(Handle::new("h-1")),
        });
        let wire = serde_json::to_value(&reference).expect("encode");
        assert_eq!(wire, json!({ "sharedId": "s-1", "handle": "h-1" }));

        let back: RemoteReference = serde_json::from_value(wire).expect("decode");
        assert_eq!(back, reference);

        let argument = LocalValue::Array {
            value: vec![reference.clone().into(), RemoteReference::handle("h-2").into()],
        };
        let wire = encode(&argument).expect("encode");
        assert_eq!(decode::<LocalValue>(&wire).expect("decode"), argument);
    }

    #[test]
    fn test_shared_reference_from_node() {
        let node: RemoteValue = decode(&json!({
            "type": "node",
            "sharedId": "n-1",
            "handle": "h-1"
        }))
        .expect("node");
        let reference = SharedReference::from_node(&node).expect("reference");
        assert_eq!(reference.shared_id.as_str(), "n-1");
        assert_eq!(reference.handle.as_ref().map(Handle::as_str), Some("h-1"));

        assert!(SharedReference::from_node(&RemoteValue::Null).is_none());
    }

    #[test]
    fn test_evaluate_result_success() {
        let result: EvaluateResult = decode(&json!({
            "type": "success",
            "result": { "type": "number", "value": 2 },
            "realm": "r-1"
        }))
        .expect("decode");
        assert!(!result.is_exception());
        assert_eq!(result.value().and_then(RemoteValue::as_f64), Some(2.0));
        assert_eq!(result.realm().as_str(), "r-1");
    }

    #[test]
    fn test_evaluate_result_exception() {
        let result: EvaluateResult = decode(&json!({
            "type": "exception",
            "exceptionDetails": {
                "columnNumber": 0,
                "exception": { "type": "error" },
                "lineNumber": 0,
                "stackTrace": { "callFrames": [] },
                "text": "ReferenceError: x is not defined"
            },
            "realm": "r-1"
        }))
        .expect("decode");
        assert!(result.is_exception());
        assert!(result.value().is_none());
    }

    #[test]
    fn test_target_shapes() {
        assert_eq!(
            serde_json::to_value(Target::context("ctx-1")).expect("encode"),
            json!({ "context": "ctx-1" })
        );
        let target: Target = serde_json::from_value(json!({ "realm": "r-9" })).expect("decode");
        assert_eq!(target, Target::realm("r-9"));
    }

    #[test]
    fn test_realm_info_kinds() {
        let window: RealmInfo = decode(&json!({
            "type": "window",
            "realm": "r-1",
            "origin": "https://example.com",
            "context": "ctx-1"
        }))
        .expect("window");
        assert_eq!(window.context().map(BrowsingContextId::as_str), Some("ctx-1"));

        let worker: RealmInfo = decode(&json!({
            "type": "dedicated-worker",
            "realm": "r-2",
            "origin": "https://example.com",
            "owners": ["r-1"]
        }))
        .expect("worker");
        assert_eq!(worker.tag(), "dedicated-worker");
        assert_eq!(worker.realm().as_str(), "r-2");
        assert!(worker.context().is_none());
    }

    fn number() -> impl Strategy<Value = Number> {
        prop_oneof![
            any::<f64>().prop_map(Number::Finite),
            Just(Number::NaN),
            Just(Number::NegativeZero),
            Just(Number::Infinity),
            Just(Number::NegativeInfinity),
        ]
    }

    fn reference() -> impl Strategy<Value = RemoteReference> {
        prop_oneof![
            ("[a-z0-9-]{1,12}", proptest::option::of("[a-z0-9-]{1,12}")).prop_map(
                |(shared_id, handle)| {
                    RemoteReference::Shared(SharedReference {
                        shared_id: SharedId::new(shared_id),
                        handle: handle.map(Handle::new),
                    })
                }
            ),
            "[a-z0-9-]{1,12}".prop_map(RemoteReference::handle),
        ]
    }

    fn local_leaf() -> impl Strategy<Value = LocalValue> {
        prop_oneof![
            Just(LocalValue::Undefined),
            Just(LocalValue::Null),
            any::<String>().prop_map(LocalValue::string),
            number().prop_map(|value| LocalValue::Number { value }),
            any::<bool>().prop_map(LocalValue::boolean),
            "-?[0-9]{1,30}".prop_map(|value| LocalValue::BigInt { value }),
            "[0-9]{4}-[0-9]{2}-[0-9]{2}".prop_map(|value| LocalValue::Date { value }),
            ("[a-z]{1,8}", proptest::option::of("[gimsuy]{0,3}")).prop_map(|(pattern, flags)| {
                LocalValue::RegExp {
                    value: RegExpValue { pattern, flags },
                }
            }),
            "[a-z0-9-]{1,12}".prop_map(LocalValue::channel),
        ]
    }

    fn local_value() -> impl Strategy<Value = LocalValue> {
        local_leaf().prop_recursive(3, 24, 4, |inner| {
            let argument = prop_oneof![
                3 => inner.clone().prop_map(ScriptArgument::Value),
                1 => reference().prop_map(ScriptArgument::Reference),
            ];
            let key = prop_oneof![
                "[a-z]{1,6}".prop_map(LocalMappingKey::String),
                inner.clone().prop_map(|v| LocalMappingKey::Value(v.into())),
            ];
            prop_oneof![
                proptest::collection::vec(argument.clone(), 0..4)
                    .prop_map(|value| LocalValue::Array { value }),
                proptest::collection::vec(argument.clone(), 0..4)
                    .prop_map(|value| LocalValue::Set { value }),
                proptest::collection::vec(("[a-z]{1,6}", argument.clone()), 0..4).prop_map(
                    |entries| LocalValue::Object {
                        value: entries
                            .into_iter()
                            .map(|(k, v)| LocalMappingEntry(LocalMappingKey::String(k), v))
                            .collect(),
                    }
                ),
                proptest::collection::vec((key, argument), 0..4).prop_map(|entries| {
                    LocalValue::Map {
                        value: entries
                            .into_iter()
                            .map(|(k, v)| LocalMappingEntry(k, v))
                            .collect(),
                    }
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_local_value_round_trip(value in local_value()) {
            let wire = encode(&value).expect("encode");
            let back: LocalValue = decode(&wire).expect("decode");
            prop_assert_eq!(back, value);
        }

        #[test]
        fn prop_script_argument_round_trip(
            argument in prop_oneof![
                local_value().prop_map(ScriptArgument::Value),
                reference().prop_map(ScriptArgument::Reference),
            ]
        ) {
            let wire = serde_json::to_value(&argument).expect("encode");
            let back: ScriptArgument = serde_json::from_value(wire).expect("decode");
            prop_assert_eq!(back, argument);
        }
    }
}
