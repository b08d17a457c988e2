//! Input action sequences for `input.performActions`.
//!
//! Each input source contributes one [`SourceActions`] entry whose
//! `actions` are ticks executed in lockstep with the other sources.
//!
//! # Example
//!
//! ```ignore
//! use bidi_engine::codec::{KeySourceActions, PointerSourceActions, SourceActions};
//!
//! let click = PointerSourceActions::new("mouse")
//!     .move_to(120.0, 48.0)
//!     .down(0)
//!     .up(0);
//!
//! let typing = KeySourceActions::new("keyboard").type_text("hi");
//!
//! let actions: Vec<SourceActions> = vec![click.into(), typing.into()];
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::TaggedFamily;
use super::script::SharedReference;

// ============================================================================
// SourceActions
// ============================================================================

/// Actions of one input source, discriminated by source `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceActions {
    /// Source that only pauses.
    None(NoneSourceActions),
    /// Keyboard.
    Key(KeySourceActions),
    /// Mouse, pen or touch pointer.
    Pointer(PointerSourceActions),
    /// Scroll wheel.
    Wheel(WheelSourceActions),
}

impl SourceActions {
    /// Returns the input source id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::None(s) => &s.id,
            Self::Key(s) => &s.id,
            Self::Pointer(s) => &s.id,
            Self::Wheel(s) => &s.id,
        }
    }
}

impl TaggedFamily for SourceActions {
    const FAMILY: &'static str = "SourceActions";
    const TAGS: &'static [&'static str] = &["none", "key", "pointer", "wheel"];

    fn tag(&self) -> &'static str {
        match self {
            Self::None(_) => "none",
            Self::Key(_) => "key",
            Self::Pointer(_) => "pointer",
            Self::Wheel(_) => "wheel",
        }
    }
}

// ============================================================================
// None Source
// ============================================================================

/// Actions of a source that only pauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoneSourceActions {
    /// Source id.
    pub id: String,
    /// Ticks.
    pub actions: Vec<NoneSourceAction>,
}

/// Tick of a none source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NoneSourceAction {
    /// Wait.
    Pause {
        /// Milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
}

impl NoneSourceActions {
    /// Creates an empty sequence.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: Vec::new(),
        }
    }

    /// Appends a pause.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.actions.push(NoneSourceAction::Pause {
            duration: Some(duration_ms),
        });
        self
    }
}

impl TaggedFamily for NoneSourceAction {
    const FAMILY: &'static str = "NoneSourceAction";
    const TAGS: &'static [&'static str] = &["pause"];

    fn tag(&self) -> &'static str {
        "pause"
    }
}

// ============================================================================
// Key Source
// ============================================================================

/// Actions of a keyboard source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySourceActions {
    /// Source id.
    pub id: String,
    /// Ticks.
    pub actions: Vec<KeySourceAction>,
}

/// Tick of a keyboard source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KeySourceAction {
    /// Wait.
    Pause {
        /// Milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    /// Press a key.
    KeyDown {
        /// Single grapheme or a WebDriver key code point.
        value: String,
    },
    /// Release a key.
    KeyUp {
        /// Single grapheme or a WebDriver key code point.
        value: String,
    },
}

impl KeySourceActions {
    /// Creates an empty sequence.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: Vec::new(),
        }
    }

    /// Appends a key press.
    #[must_use]
    pub fn key_down(mut self, key: char) -> Self {
        self.actions.push(KeySourceAction::KeyDown {
            value: key.to_string(),
        });
        self
    }

    /// Appends a key release.
    #[must_use]
    pub fn key_up(mut self, key: char) -> Self {
        self.actions.push(KeySourceAction::KeyUp {
            value: key.to_string(),
        });
        self
    }

    /// Appends a press and release for every character of `text`.
    #[must_use]
    pub fn type_text(self, text: &str) -> Self {
        text.chars().fold(self, |acc, c| acc.key_down(c).key_up(c))
    }

    /// Appends a pause.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.actions.push(KeySourceAction::Pause {
            duration: Some(duration_ms),
        });
        self
    }
}

impl TaggedFamily for KeySourceAction {
    const FAMILY: &'static str = "KeySourceAction";
    const TAGS: &'static [&'static str] = &["pause", "keyDown", "keyUp"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Pause { .. } => "pause",
            Self::KeyDown { .. } => "keyDown",
            Self::KeyUp { .. } => "keyUp",
        }
    }
}

// ============================================================================
// Pointer Source
// ============================================================================

/// Actions of a pointer source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerSourceActions {
    /// Source id.
    pub id: String,
    /// Pointer kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<PointerParameters>,
    /// Ticks.
    pub actions: Vec<PointerSourceAction>,
}

/// Pointer source parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerParameters {
    /// Pointer kind.
    pub pointer_type: PointerType,
}

/// Pointer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerType {
    /// Mouse.
    #[default]
    Mouse,
    /// Pen.
    Pen,
    /// Touch.
    Touch,
}

/// Tick of a pointer source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerSourceAction {
    /// Wait.
    Pause {
        /// Milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    /// Press a button.
    PointerDown(PointerDownAction),
    /// Release a button.
    PointerUp {
        /// Button index.
        button: u32,
    },
    /// Move the pointer.
    PointerMove(PointerMoveAction),
}

/// Fields of a `pointerDown` tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerDownAction {
    /// Button index.
    pub button: u32,
    /// Contact geometry.
    #[serde(flatten)]
    pub properties: PointerCommonProperties,
}

/// Fields of a `pointerMove` tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerMoveAction {
    /// Target x, relative to `origin`.
    pub x: f64,
    /// Target y, relative to `origin`.
    pub y: f64,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Coordinate origin; the viewport when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    /// Contact geometry.
    #[serde(flatten)]
    pub properties: PointerCommonProperties,
}

/// Optional contact geometry of pen and touch pointers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerCommonProperties {
    /// Contact width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Contact height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Normalized pressure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    /// Normalized tangential pressure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tangential_pressure: Option<f64>,
    /// Clockwise rotation in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twist: Option<u32>,
    /// Altitude angle in radians.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_angle: Option<f64>,
    /// Azimuth angle in radians.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azimuth_angle: Option<f64>,
}

impl PointerSourceActions {
    /// Creates an empty mouse sequence.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parameters: None,
            actions: Vec::new(),
        }
    }

    /// Sets the pointer kind.
    #[must_use]
    pub fn pointer_type(mut self, pointer_type: PointerType) -> Self {
        self.parameters = Some(PointerParameters { pointer_type });
        self
    }

    /// Appends a move to viewport coordinates.
    #[must_use]
    pub fn move_to(mut self, x: f64, y: f64) -> Self {
        self.actions.push(PointerSourceAction::PointerMove(PointerMoveAction {
            x,
            y,
            duration: None,
            origin: None,
            properties: PointerCommonProperties::default(),
        }));
        self
    }

    /// Appends a move relative to the centre of an element.
    #[must_use]
    pub fn move_to_element(mut self, element: SharedReference, x: f64, y: f64) -> Self {
        self.actions.push(PointerSourceAction::PointerMove(PointerMoveAction {
            x,
            y,
            duration: None,
            origin: Some(Origin::Element(element)),
            properties: PointerCommonProperties::default(),
        }));
        self
    }

    /// Appends a button press.
    #[must_use]
    pub fn down(mut self, button: u32) -> Self {
        self.actions.push(PointerSourceAction::PointerDown(PointerDownAction {
            button,
            properties: PointerCommonProperties::default(),
        }));
        self
    }

    /// Appends a button release.
    #[must_use]
    pub fn up(mut self, button: u32) -> Self {
        self.actions.push(PointerSourceAction::PointerUp { button });
        self
    }

    /// Appends a pause.
    #[must_use]
    pub fn pause(mut self, duration_ms: u64) -> Self {
        self.actions.push(PointerSourceAction::Pause {
            duration: Some(duration_ms),
        });
        self
    }
}

impl TaggedFamily for PointerSourceAction {
    const FAMILY: &'static str = "PointerSourceAction";
    const TAGS: &'static [&'static str] = &["pause", "pointerDown", "pointerUp", "pointerMove"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Pause { .. } => "pause",
            Self::PointerDown(_) => "pointerDown",
            Self::PointerUp { .. } => "pointerUp",
            Self::PointerMove(_) => "pointerMove",
        }
    }
}

// ============================================================================
// Wheel Source
// ============================================================================

/// Actions of a wheel source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelSourceActions {
    /// Source id.
    pub id: String,
    /// Ticks.
    pub actions: Vec<WheelSourceAction>,
}

/// Tick of a wheel source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WheelSourceAction {
    /// Wait.
    Pause {
        /// Milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    /// Scroll.
    Scroll(WheelScrollAction),
}

/// Fields of a `scroll` tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelScrollAction {
    /// Pointer x, relative to `origin`.
    pub x: i64,
    /// Pointer y, relative to `origin`.
    pub y: i64,
    /// Horizontal scroll amount.
    pub delta_x: i64,
    /// Vertical scroll amount.
    pub delta_y: i64,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Coordinate origin; the viewport when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl WheelSourceActions {
    /// Creates an empty sequence.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: Vec::new(),
        }
    }

    /// Appends a scroll at viewport coordinates.
    #[must_use]
    pub fn scroll(mut self, x: i64, y: i64, delta_x: i64, delta_y: i64) -> Self {
        self.actions.push(WheelSourceAction::Scroll(WheelScrollAction {
            x,
            y,
            delta_x,
            delta_y,
            duration: None,
            origin: None,
        }));
        self
    }
}

impl TaggedFamily for WheelSourceAction {
    const FAMILY: &'static str = "WheelSourceAction";
    const TAGS: &'static [&'static str] = &["pause", "scroll"];

    fn tag(&self) -> &'static str {
        match self {
            Self::Pause { .. } => "pause",
            Self::Scroll(_) => "scroll",
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<NoneSourceActions> for SourceActions {
    fn from(actions: NoneSourceActions) -> Self {
        Self::None(actions)
    }
}

impl From<KeySourceActions> for SourceActions {
    fn from(actions: KeySourceActions) -> Self {
        Self::Key(actions)
    }
}

impl From<PointerSourceActions> for SourceActions {
    fn from(actions: PointerSourceActions) -> Self {
        Self::Pointer(actions)
    }
}

impl From<WheelSourceActions> for SourceActions {
    fn from(actions: WheelSourceActions) -> Self {
        Self::Wheel(actions)
    }
}

// ============================================================================
// Origin
// ============================================================================

/// Coordinate origin of pointer and wheel moves.
///
/// Wire form is the keyword `"viewport"` or `"pointer"`, or an object
/// `{ "type": "element", "element": <SharedReference> }`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Origin {
    /// Top-left of the viewport.
    #[default]
    Viewport,
    /// Current pointer position.
    Pointer,
    /// Centre of an element.
    Element(SharedReference),
}

#[derive(Serialize)]
struct ElementOriginRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    element: &'a SharedReference,
}

#[derive(Deserialize)]
struct ElementOriginRepr {
    #[serde(rename = "type")]
    kind: String,
    element: SharedReference,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OriginRepr {
    Keyword(String),
    Element(ElementOriginRepr),
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Viewport => serializer.serialize_str("viewport"),
            Self::Pointer => serializer.serialize_str("pointer"),
            Self::Element(element) => ElementOriginRef {
                kind: "element",
                element,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Origin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match OriginRepr::deserialize(deserializer)? {
            OriginRepr::Keyword(keyword) => match keyword.as_str() {
                "viewport" => Ok(Self::Viewport),
                "pointer" => Ok(Self::Pointer),
                other => Err(D::Error::custom(format!(
                    "unknown Origin '{other}', expected one of: viewport, pointer, element"
                ))),
            },
            OriginRepr::Element(repr) if repr.kind == "element" => Ok(Self::Element(repr.element)),
            OriginRepr::Element(repr) => Err(D::Error::custom(format!(
                "unknown Origin type '{}', expected 'element'",
                repr.kind
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
