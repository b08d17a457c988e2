//! Browsing-context and user-context extraction from raw event params.
//!
//! Listener scoping needs to know which context an event belongs to before
//! (and independently of) typed decoding. Payload shapes differ per event,
//! so the lookup is layered:
//!
//! 1. top-level `context`
//! 2. the carrier of the event's family (`source.context`, `realm.context`, …)
//! 3. generic carriers: `target.context`, `params.context`, `browsingContext`
//! 4. a depth-limited scan for `context`, `browsingContext`, `contextId`,
//!    then any key ending in `Context` other than `userContext`
//!
//! Strings, numbers and booleans are accepted and stringified. Empty strings
//! count as absent. Object keys are visited in the map's iteration order.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::identifiers::{BrowsingContextId, UserContextId};
use crate::protocol::EventKind;

// ============================================================================
// Constants
// ============================================================================

/// Maximum nesting depth searched by the fallback scan.
const SCAN_DEPTH: i32 = 3;

// ============================================================================
// EventContext
// ============================================================================

/// Scope ids found in an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    /// Browsing context the event belongs to.
    pub context: Option<BrowsingContextId>,
    /// User context the event belongs to.
    pub user_context: Option<UserContextId>,
}

// ============================================================================
// Public API
// ============================================================================

/// Extracts both scope ids.
#[must_use]
pub fn extract(kind: EventKind, params: &Value) -> EventContext {
    EventContext {
        context: extract_context_id(kind, params),
        user_context: extract_user_context_id(kind, params),
    }
}

/// Extracts the browsing context id.
#[must_use]
pub fn extract_context_id(kind: EventKind, params: &Value) -> Option<BrowsingContextId> {
    if !params.is_object() {
        return None;
    }

    path(params, &["context"])
        .or_else(|| family_carrier(kind, params))
        .or_else(|| path(params, &["target", "context"]))
        .or_else(|| path(params, &["params", "context"]))
        .or_else(|| path(params, &["browsingContext"]))
        .or_else(|| find_context_like(params))
        .map(BrowsingContextId::new)
}

/// Extracts the user context id.
#[must_use]
pub fn extract_user_context_id(_kind: EventKind, params: &Value) -> Option<UserContextId> {
    if !params.is_object() {
        return None;
    }

    path(params, &["userContext"])
        .or_else(|| path(params, &["context", "userContext"]))
        .or_else(|| path(params, &["params", "userContext"]))
        .or_else(|| find_key(params, "userContext", SCAN_DEPTH))
        .map(UserContextId::new)
}

// ============================================================================
// Layers
// ============================================================================

fn family_carrier(kind: EventKind, params: &Value) -> Option<String> {
    match kind {
        EventKind::ScriptMessage => {
            path(params, &["source", "context"]).or_else(|| path(params, &["realm", "context"]))
        }
        EventKind::LogEntryAdded => path(params, &["source", "context"]),
        k if k.is_realm_event() => path(params, &["realm", "context"]),
        k if k.is_browsing_context_event() => path(params, &["params", "context"]),
        _ => None,
    }
}

fn find_context_like(params: &Value) -> Option<String> {
    find_key(params, "context", SCAN_DEPTH)
        .or_else(|| find_key(params, "browsingContext", SCAN_DEPTH))
        .or_else(|| find_key(params, "contextId", SCAN_DEPTH))
        .or_else(|| find_suffix(params, "Context", SCAN_DEPTH))
}

// ============================================================================
// JSON Helpers
// ============================================================================

/// Reads a scalar at a key path.
fn path(root: &Value, keys: &[&str]) -> Option<String> {
    let leaf = keys.iter().try_fold(root, |node, key| node.as_object()?.get(*key))?;
    scalar(leaf)
}

/// Stringifies a non-empty scalar.
fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Depth-first search for an exact key.
fn find_key(value: &Value, key: &str, depth: i32) -> Option<String> {
    if depth < 0 {
        return None;
    }
    match value {
        Value::Object(map) => map
            .get(key)
            .and_then(scalar)
            .or_else(|| map.values().find_map(|child| find_key(child, key, depth - 1))),
        Value::Array(items) => items.iter().find_map(|item| find_key(item, key, depth)),
        _ => None,
    }
}

/// Depth-first search for a key ending in `suffix`, skipping `userContext`.
fn find_suffix(value: &Value, suffix: &str, depth: i32) -> Option<String> {
    if depth < 0 {
        return None;
    }
    match value {
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            let direct = (k.ends_with(suffix) && k != "userContext")
                .then(|| scalar(v))
                .flatten();
            direct.or_else(|| find_suffix(v, suffix, depth - 1))
        }),
        Value::Array(items) => items.iter().find_map(|item| find_suffix(item, suffix, depth)),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx(kind: EventKind, params: Value) -> Option<String> {
        extract_context_id(kind, &params).map(|c| c.as_str().to_string())
    }

    #[test]
    fn test_top_level_context() {
        assert_eq!(
            ctx(EventKind::Load, json!({ "context": "ctx-1", "url": "about:blank" })),
            Some("ctx-1".to_string())
        );
    }

    #[test]
    fn test_log_entry_source_context() {
        let params = json!({
            "type": "console",
            "level": "info",
            "source": { "realm": "r-1", "context": "ctx-7" },
            "text": "hi"
        });
        assert_eq!(ctx(EventKind::LogEntryAdded, params), Some("ctx-7".to_string()));
    }

    #[test]
    fn test_script_message_prefers_source_then_realm() {
        assert_eq!(
            ctx(
                EventKind::ScriptMessage,
                json!({ "source": { "context": "ctx-s" }, "realm": { "context": "ctx-r" } })
            ),
            Some("ctx-s".to_string())
        );
        assert_eq!(
            ctx(EventKind::ScriptMessage, json!({ "source": {}, "realm": { "context": "ctx-r" } })),
            Some("ctx-r".to_string())
        );
    }

    #[test]
    fn test_realm_event_carrier() {
        assert_eq!(
            ctx(EventKind::RealmDestroyed, json!({ "realm": { "context": "ctx-3" } })),
            Some("ctx-3".to_string())
        );
    }

    #[test]
    fn test_generic_carriers() {
        assert_eq!(
            ctx(EventKind::FetchError, json!({ "target": { "context": "ctx-t" } })),
            Some("ctx-t".to_string())
        );
        assert_eq!(
            ctx(EventKind::FetchError, json!({ "browsingContext": "ctx-b" })),
            Some("ctx-b".to_string())
        );
    }

    #[test]
    fn test_empty_string_is_absent() {
        assert_eq!(
            ctx(EventKind::Load, json!({ "context": "", "browsingContext": "ctx-b" })),
            Some("ctx-b".to_string())
        );
    }

    #[test]
    fn test_primitives_are_stringified() {
        assert_eq!(ctx(EventKind::Load, json!({ "context": 42 })), Some("42".to_string()));
        assert_eq!(ctx(EventKind::Load, json!({ "context": true })), Some("true".to_string()));
        assert_eq!(ctx(EventKind::Load, json!({ "context": null })), None);
    }

    #[test]
    fn test_deep_scan_within_depth() {
        let params = json!({ "a": { "b": { "context": "deep" } } });
        assert_eq!(ctx(EventKind::FetchError, params), Some("deep".to_string()));

        let too_deep = json!({ "a": { "b": { "c": { "d": { "context": "hidden" } } } } });
        assert_eq!(ctx(EventKind::FetchError, too_deep), None);
    }

    #[test]
    fn test_deep_scan_through_arrays() {
        let params = json!({ "items": [{ "x": 1 }, { "contextId": "from-array" }] });
        assert_eq!(ctx(EventKind::FetchError, params), Some("from-array".to_string()));
    }

    #[test]
    fn test_suffix_match_skips_user_context() {
        assert_eq!(ctx(EventKind::FetchError, json!({ "userContext": "uc-1" })), None);
        assert_eq!(
            ctx(EventKind::FetchError, json!({ "userContext": "uc-1", "openerContext": "ctx-o" })),
            Some("ctx-o".to_string())
        );

        let nested = json!({ "info": { "owner": { "userContext": "uc-2" } } });
        let found = extract(EventKind::FetchError, &nested);
        assert_eq!(found.context, None);
        assert_eq!(found.user_context.map(|u| u.to_string()), Some("uc-2".to_string()));
    }

    #[test]
    fn test_non_object_params() {
        assert_eq!(ctx(EventKind::Load, json!(["context"])), None);
        assert_eq!(ctx(EventKind::Load, json!(null)), None);
    }

    #[test]
    fn test_user_context_layers() {
        let direct = json!({ "userContext": "uc-1" });
        assert_eq!(
            extract_user_context_id(EventKind::ContextCreated, &direct).map(|u| u.to_string()),
            Some("uc-1".to_string())
        );

        let nested = json!({ "context": { "userContext": "uc-2" } });
        assert_eq!(
            extract_user_context_id(EventKind::ContextCreated, &nested).map(|u| u.to_string()),
            Some("uc-2".to_string())
        );

        let deep = json!({ "info": { "owner": { "userContext": "uc-3" } } });
        assert_eq!(
            extract_user_context_id(EventKind::ContextCreated, &deep).map(|u| u.to_string()),
            Some("uc-3".to_string())
        );
    }

    #[test]
    fn test_extract_both() {
        let scope = extract(
            EventKind::ContextCreated,
            &json!({ "context": "ctx-1", "userContext": "default", "url": "about:blank" }),
        );
        assert_eq!(scope.context.map(|c| c.to_string()), Some("ctx-1".to_string()));
        assert_eq!(scope.user_context.map(|u| u.to_string()), Some("default".to_string()));
    }
}
