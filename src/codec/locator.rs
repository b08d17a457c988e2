//! Node locator strategies for `browsingContext.locateNodes`.
//!
//! # Example
//!
//! ```ignore
//! use bidi_engine::codec::Locator;
//!
//! // CSS selector
//! let btn = Locator::css("#submit");
//!
//! // XPath
//! let form = Locator::xpath("//form[@id='login']");
//!
//! // Visible text, case-insensitive partial match
//! let link = Locator::inner_text("sign in").ignore_case().partial();
//!
//! // Accessible name and role
//! let nav = Locator::accessibility(Some("Main"), Some("navigation"));
//! ```

use serde::{Deserialize, Serialize};

use crate::identifiers::BrowsingContextId;

use super::TaggedFamily;

// ============================================================================
// Locator
// ============================================================================

/// Node locator strategy.
///
/// Wire shape is `{ "type": <strategy>, "value": ..., ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Locator {
    /// Accessible name and/or ARIA role.
    #[serde(rename = "accessibility")]
    Accessibility {
        /// Query fields.
        value: AccessibilityQuery,
    },

    /// Container node of a child browsing context.
    #[serde(rename = "context")]
    Context {
        /// Query fields.
        value: ContextQuery,
    },

    /// CSS selector.
    #[serde(rename = "css")]
    Css {
        /// Selector text.
        value: String,
    },

    /// Rendered text content.
    #[serde(rename = "innerText")]
    InnerText {
        /// Text to match.
        value: String,
        /// Case-insensitive comparison.
        #[serde(rename = "ignoreCase", skip_serializing_if = "Option::is_none")]
        ignore_case: Option<bool>,
        /// Full or partial match.
        #[serde(rename = "matchType", skip_serializing_if = "Option::is_none")]
        match_type: Option<MatchType>,
        /// Maximum descendant depth to search.
        #[serde(rename = "maxDepth", skip_serializing_if = "Option::is_none")]
        max_depth: Option<u32>,
    },

    /// XPath expression.
    #[serde(rename = "xpath")]
    XPath {
        /// Expression text.
        value: String,
    },
}

/// Fields of an accessibility locator. At least one should be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityQuery {
    /// Accessible name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ARIA role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Fields of a context locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextQuery {
    /// Child browsing context whose container should be located.
    pub context: BrowsingContextId,
}

/// Inner text match mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Entire text must match.
    Full,
    /// Text must contain the value.
    Partial,
}

// ============================================================================
// Constructors
// ============================================================================

impl Locator {
    /// Creates a CSS selector locator.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            value: selector.into(),
        }
    }

    /// Creates an XPath locator.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath { value: expr.into() }
    }

    /// Creates an inner text locator with default matching.
    #[inline]
    pub fn inner_text(text: impl Into<String>) -> Self {
        Self::InnerText {
            value: text.into(),
            ignore_case: None,
            match_type: None,
            max_depth: None,
        }
    }

    /// Creates an accessibility locator.
    #[inline]
    pub fn accessibility(name: Option<&str>, role: Option<&str>) -> Self {
        Self::Accessibility {
            value: AccessibilityQuery {
                name: name.map(str::to_string),
                role: role.map(str::to_string),
            },
        }
    }

    /// Creates a context container locator.
    #[inline]
    pub fn context(context: impl Into<BrowsingContextId>) -> Self {
        Self::Context {
            value: ContextQuery {
                context: context.into(),
            },
        }
    }

    /// Makes an inner text locator case-insensitive. No-op for other strategies.
    #[must_use]
    pub fn ignore_case(mut self) -> Self {
        if let Self::InnerText { ignore_case, .. } = &mut self {
            *ignore_case = Some(true);
        }
        self
    }

    /// Makes an inner text locator match partially. No-op for other strategies.
    #[must_use]
    pub fn partial(mut self) -> Self {
        if let Self::InnerText { match_type, .. } = &mut self {
            *match_type = Some(MatchType::Partial);
        }
        self
    }

    /// Limits inner text search depth. No-op for other strategies.
    #[must_use]
    pub fn max_depth(mut self, depth: u32) -> Self {
        if let Self::InnerText { max_depth, .. } = &mut self {
            *max_depth = Some(depth);
        }
        self
    }
}

// ============================================================================
// TaggedFamily
// ============================================================================

impl TaggedFamily for Locator {
    const FAMILY: &'static str = "Locator";
    const TAGS: &'static [&'static str] = &["accessibility", "context", "css", "innerText", "xpath"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Accessibility { .. } => "accessibility",
            Self::Context { .. } => "context",
            Self::Css { .. } => "css",
            Self::InnerText { .. } => "innerText",
            Self::XPath { .. } => "xpath",
        }
    }
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for Locator {
    /// Converts a string to a CSS locator (default).
    fn from(s: &str) -> Self {
        Self::css(s)
    }
}

impl From<String> for Locator {
    /// Converts a string to a CSS locator (default).
    fn from(s: String) -> Self {
        Self::Css { value: s }
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
    fn test_css_wire_shape() {
        let wire = encode(&Locator::css("#login")).expect("encode");
        assert_eq!(wire, json!({ "type": "css", "value": "#login" }));
    }

    #[test]
    fn test_inner_text_options() {
        let locator = Locator::inner_text("Sign in").ignore_case().partial().max_depth(4);
        let wire = encode(&locator).expect("encode");
        assert_eq!(
            wire,
            json!({
                "type": "innerText",
                "value": "Sign in",
                "ignoreCase": true,
                "matchType": "partial",
                "maxDepth": 4
            })
        );
    }

    #[test]
    fn test_inner_text_optional_fields_omitted() {
        let wire = encode(&Locator::inner_text("x")).expect("encode");
        assert_eq!(wire, json!({ "type": "innerText", "value": "x" }));
    }

    #[test]
    fn test_builder_noop_on_other_strategies() {
        assert_eq!(Locator::css("a").ignore_case().partial(), Locator::css("a"));
    }

    #[test]
    fn test_decode_accessibility() {
        let locator: Locator = decode(&json!({
            "type": "accessibility",
            "value": { "role": "button" }
        }))
        .expect("decode");
        assert_eq!(locator, Locator::accessibility(None, Some("button")));
        assert_eq!(locator.tag(), "accessibility");
    }

    #[test]
    fn test_decode_context() {
        let locator: Locator = decode(&json!({
            "type": "context",
            "value": { "context": "frame-9" }
        }))
        .expect("decode");
        assert_eq!(locator, Locator::context("frame-9"));
    }

    #[test]
    fn test_decode_unknown_strategy_fails() {
        let err = decode::<Locator>(&json!({ "type": "partialLinkText", "value": "x" }))
            .expect_err("unknown strategy");
        assert!(err.is_decode());
    }

    #[test]
    fn test_from_str() {
        let locator: Locator = "#login".into();
        assert!(matches!(locator, Locator::Css { .. }));
    }

    fn locator_strategy() -> impl Strategy<Value = Locator> {
        prop_oneof![
            any::<String>().prop_map(Locator::css),
            any::<String>().prop_map(Locator::xpath),
            any::<String>().prop_map(|s| Locator::context(s)),
            (
                proptest::option::of(any::<String>()),
                proptest::option::of(any::<String>())
            )
                .prop_map(|(name, role)| Locator::Accessibility {
                    value: AccessibilityQuery { name, role }
                }),
            (
                any::<String>(),
                proptest::option::of(any::<bool>()),
                proptest::option::of(prop_oneof![Just(MatchType::Full), Just(MatchType::Partial)]),
                proptest::option::of(any::<u32>())
            )
                .prop_map(|(value, ignore_case, match_type, max_depth)| Locator::InnerText {
                    value,
                    ignore_case,
                    match_type,
                    max_depth,
                }),
        ]
    }

    proptest! {
        #[test]
        fn prop_locator_round_trip(locator in locator_strategy()) {
            let wire = encode(&locator).expect("encode");
            let back: Locator = decode(&wire).expect("decode");
            prop_assert_eq!(back, locator);
        }
    }
}
