//! Typed command definitions.
//!
//! Each command is a params struct implementing [`BidiCommand`], which ties
//! it to its wire method name and the type its `result` decodes into.
//!
//! # Provided Commands
//!
//! | Module | Commands |
//! |--------|----------|
//! | `session` | [`SessionStatus`], [`Subscribe`], [`Unsubscribe`] |
//! | `browsingContext` | [`GetTree`], [`Navigate`], [`LocateNodes`] |
//! | `script` | [`Evaluate`], [`CallFunction`] |
//! | `input` | [`PerformActions`], [`ReleaseActions`] |
//!
//! Commands outside this set go through `Engine::send_raw`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::{self, DeserializeOwned, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::script::SerializationOptions;
use crate::codec::{
    EvaluateResult, Locator, RemoteValue, ResultOwnership, ScriptArgument, SharedReference,
    SourceActions, Target,
};
use crate::identifiers::{BrowsingContextId, NavigationId, SubscriptionId, UserContextId};

// ============================================================================
// BidiCommand
// ============================================================================

/// A command with a fixed method name and result type.
pub trait BidiCommand: Serialize {
    /// Wire method name in `module.methodName` format.
    const METHOD: &'static str;

    /// Type the response `result` decodes into.
    type Output: DeserializeOwned;
}

/// Result of commands that return an empty object.
///
/// A `null` or absent `result` is accepted as well, and members are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyResult {}

impl<'de> Deserialize<'de> for EmptyResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EmptyVisitor;

        impl<'de> Visitor<'de> for EmptyVisitor {
            type Value = EmptyResult;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<EmptyResult, E> {
                Ok(EmptyResult {})
            }

            fn visit_none<E: de::Error>(self) -> Result<EmptyResult, E> {
                Ok(EmptyResult {})
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<EmptyResult, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(EmptyResult {})
            }
        }

        deserializer.deserialize_any(EmptyVisitor)
    }
}

// ============================================================================
// Session Commands
// ============================================================================

/// `session.status`
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SessionStatus {}

/// Result of [`SessionStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusResult {
    /// Whether the remote end can create new sessions.
    pub ready: bool,
    /// Implementation-defined status text; empty when the remote end omits it.
    #[serde(default)]
    pub message: String,
}

impl BidiCommand for SessionStatus {
    const METHOD: &'static str = "session.status";
    type Output = StatusResult;
}

/// `session.subscribe`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscribe {
    /// Event or module names.
    pub events: Vec<String>,
    /// Restrict to these top-level browsing contexts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
    /// Restrict to these user contexts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

impl Subscribe {
    /// Subscribes to events in every context.
    #[inline]
    pub fn global(events: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            contexts: None,
            user_contexts: None,
        }
    }
}

/// Result of [`Subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscribeResult {
    /// Id to pass to [`Unsubscribe`].
    pub subscription: SubscriptionId,
}

impl BidiCommand for Subscribe {
    const METHOD: &'static str = "session.subscribe";
    type Output = SubscribeResult;
}

/// `session.unsubscribe` by subscription id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unsubscribe {
    /// Subscriptions to remove.
    pub subscriptions: Vec<SubscriptionId>,
}

impl Unsubscribe {
    /// Removes one subscription.
    #[inline]
    #[must_use]
    pub fn one(id: SubscriptionId) -> Self {
        Self {
            subscriptions: vec![id],
        }
    }
}

impl BidiCommand for Unsubscribe {
    const METHOD: &'static str = "session.unsubscribe";
    type Output = EmptyResult;
}

// ============================================================================
// BrowsingContext Commands
// ============================================================================

/// `browsingContext.getTree`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTree {
    /// Depth of children to include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    /// Root context; all top-level contexts when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<BrowsingContextId>,
}

/// Result of [`GetTree`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GetTreeResult {
    /// Context trees.
    pub contexts: Vec<BrowsingContextInfo>,
}

/// One node of the browsing context tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowsingContextInfo {
    /// Context id.
    pub context: BrowsingContextId,
    /// Current URL.
    pub url: String,
    /// Child contexts, absent beyond `maxDepth`.
    #[serde(default)]
    pub children: Option<Vec<BrowsingContextInfo>>,
    /// Parent context, for frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<BrowsingContextId>,
    /// Owning user context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<UserContextId>,
    /// Context that opened this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_opener: Option<BrowsingContextId>,
    /// OS window id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_window: Option<String>,
}

impl BidiCommand for GetTree {
    const METHOD: &'static str = "browsingContext.getTree";
    type Output = GetTreeResult;
}

/// `browsingContext.navigate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigate {
    /// Context to navigate.
    pub context: BrowsingContextId,
    /// Destination URL.
    pub url: String,
    /// Readiness to wait for before responding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<ReadinessState>,
}

impl Navigate {
    /// Navigates and waits for the `load` event.
    #[inline]
    pub fn new(context: impl Into<BrowsingContextId>, url: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            url: url.into(),
            wait: Some(ReadinessState::Complete),
        }
    }
}

/// Document readiness to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    /// Return immediately.
    None,
    /// Wait for `DOMContentLoaded`.
    Interactive,
    /// Wait for `load`.
    Complete,
}

/// Result of [`Navigate`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NavigateResult {
    /// Navigation id, absent for same-document navigations.
    #[serde(default)]
    pub navigation: Option<NavigationId>,
    /// Final URL.
    pub url: String,
}

impl BidiCommand for Navigate {
    const METHOD: &'static str = "browsingContext.navigate";
    type Output = NavigateResult;
}

/// `browsingContext.locateNodes`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateNodes {
    /// Context to search.
    pub context: BrowsingContextId,
    /// Locator strategy.
    pub locator: Locator,
    /// Maximum number of nodes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_node_count: Option<u32>,
    /// Serialization limits for returned nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    /// Roots to search under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_nodes: Option<Vec<SharedReference>>,
}

impl LocateNodes {
    /// Locates nodes in the whole document.
    #[inline]
    pub fn new(context: impl Into<BrowsingContextId>, locator: impl Into<Locator>) -> Self {
        Self {
            context: context.into(),
            locator: locator.into(),
            max_node_count: None,
            serialization_options: None,
            start_nodes: None,
        }
    }

    /// Limits the number of returned nodes.
    #[must_use]
    pub fn max_node_count(mut self, count: u32) -> Self {
        self.max_node_count = Some(count);
        self
    }

    /// Searches beneath the given nodes only.
    #[must_use]
    pub fn within(mut self, nodes: Vec<SharedReference>) -> Self {
        self.start_nodes = Some(nodes);
        self
    }
}

/// Result of [`LocateNodes`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocateNodesResult {
    /// Matching nodes, as `node` remote values.
    pub nodes: Vec<RemoteValue>,
}

impl BidiCommand for LocateNodes {
    const METHOD: &'static str = "browsingContext.locateNodes";
    type Output = LocateNodesResult;
}

// ============================================================================
// Script Commands
// ============================================================================

/// `script.evaluate`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluate {
    /// Script source.
    pub expression: String,
    /// Where to run it.
    pub target: Target,
    /// Wait for a returned promise to settle.
    pub await_promise: bool,
    /// Handle retention for the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ownership: Option<ResultOwnership>,
    /// Serialization limits for the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    /// Treat the call as a user activation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_activation: Option<bool>,
}

impl Evaluate {
    /// Evaluates an expression, awaiting promises.
    #[inline]
    pub fn new(target: Target, expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            target,
            await_promise: true,
            result_ownership: None,
            serialization_options: None,
            user_activation: None,
        }
    }
}

impl BidiCommand for Evaluate {
    const METHOD: &'static str = "script.evaluate";
    type Output = EvaluateResult;
}

/// `script.callFunction`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunction {
    /// Function source, e.g. `(a, b) => a + b`.
    pub function_declaration: String,
    /// Wait for a returned promise to settle.
    pub await_promise: bool,
    /// Where to run it.
    pub target: Target,
    /// Call arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<ScriptArgument>>,
    /// `this` binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub this: Option<ScriptArgument>,
    /// Handle retention for the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ownership: Option<ResultOwnership>,
    /// Serialization limits for the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization_options: Option<SerializationOptions>,
    /// Treat the call as a user activation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_activation: Option<bool>,
}

impl CallFunction {
    /// Calls a function declaration, awaiting promises.
    #[inline]
    pub fn new(target: Target, function_declaration: impl Into<String>) -> Self {
        Self {
            function_declaration: function_declaration.into(),
            await_promise: true,
            target,
            arguments: None,
            this: None,
            result_ownership: None,
            serialization_options: None,
            user_activation: None,
        }
    }

    /// Sets the call arguments.
    #[must_use]
    pub fn arguments(mut self, arguments: impl IntoIterator<Item = ScriptArgument>) -> Self {
        self.arguments = Some(arguments.into_iter().collect());
        self
    }
}

impl BidiCommand for CallFunction {
    const METHOD: &'static str = "script.callFunction";
    type Output = EvaluateResult;
}

// ============================================================================
// Input Commands
// ============================================================================

/// `input.performActions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformActions {
    /// Target context.
    pub context: BrowsingContextId,
    /// One entry per input source.
    pub actions: Vec<SourceActions>,
}

impl PerformActions {
    /// Creates the command.
    #[inline]
    pub fn new(context: impl Into<BrowsingContextId>, actions: Vec<SourceActions>) -> Self {
        Self {
            context: context.into(),
            actions,
        }
    }
}

impl BidiCommand for PerformActions {
    const METHOD: &'static str = "input.performActions";
    type Output = EmptyResult;
}

/// `input.releaseActions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseActions {
    /// Target context.
    pub context: BrowsingContextId,
}

impl BidiCommand for ReleaseActions {
    const METHOD: &'static str = "input.releaseActions";
    type Output = EmptyResult;
}

// ============================================================================
// Tests
// ============================================================================
