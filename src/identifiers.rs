//! Type-safe identifier wrappers.
//!
//! Newtypes keep protocol ids from being mixed up at compile time: a
//! browsing context id cannot be passed where a realm id is expected.
//!
//! | Type | Wire form | Assigned by |
//! |------|-----------|-------------|
//! | [`CommandId`] | integer | engine (correlator) |
//! | [`ListenerId`] | (local only) | engine (subscriptions) |
//! | [`BrowsingContextId`] | string | remote end |
//! | [`UserContextId`] | string | remote end |
//! | [`SubscriptionId`] | string | remote end |
//! | [`RealmId`] | string | remote end |
//! | [`NavigationId`] | string | remote end |
//! | [`RequestId`] | string | remote end |
//! | [`SharedId`] | string | remote end |
//! | [`Handle`] | string | remote end |
//! | [`InternalId`] | string | remote end |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Identifier of a command on one connection.
///
/// Monotonically increasing, assigned at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Local identifier of one registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw id.
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Browsing context (tab or frame) id.
    BrowsingContextId
);

string_id!(
    /// User context (profile partition) id.
    UserContextId
);

string_id!(
    /// Remote subscription id returned by `session.subscribe`.
    SubscriptionId
);

string_id!(
    /// Script realm id.
    RealmId
);

string_id!(
    /// Navigation id.
    NavigationId
);

string_id!(
    /// Network request id.
    RequestId
);

string_id!(
    /// Shared id of a DOM node, valid across realms.
    SharedId
);

string_id!(
    /// Handle of a remote object inside one realm.
    Handle
);

string_id!(
    /// Internal id used to detect cycles in serialized remote values.
    InternalId
);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id_display() {
        assert_eq!(CommandId::new(42).to_string(), "42");
        assert_eq!(CommandId::new(42).as_u64(), 42);
    }

    #[test]
    fn test_command_id_ordering() {
        assert!(CommandId::new(1) < CommandId::new(2));
    }

    #[test]
    fn test_string_id_serde_transparent() {
        let id = BrowsingContextId::new("ctx-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"ctx-1\"");

        let back: BrowsingContextId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
        assert_eq!(back.as_str(), "ctx-1");
    }

    #[test]
    fn test_string_id_from() {
        let a: SharedId = "node-1".into();
        let b = SharedId::from("node-1".to_string());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "node-1");
    }
}
