//! Event registry and typed event payloads.
//!
//! [`EventKind`] is the closed set of events the engine understands. Each
//! kind maps to its wire method, its module, a description and a decoder
//! producing the matching [`BidiEvent`] variant. Events whose method is not
//! in the registry are dropped by the router.
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `browsingContext` | `contextCreated`, `contextDestroyed`, `navigationStarted`, `fragmentNavigated`, `historyUpdated`, `domContentLoaded`, `load`, `downloadWillBegin`, `navigationAborted`, `navigationCommitted`, `navigationFailed`, `userPromptClosed`, `userPromptOpened` |
//! | `network` | `authRequired`, `beforeRequestSent`, `fetchError`, `responseCompleted`, `responseStarted` |
//! | `script` | `message`, `realmCreated`, `realmDestroyed` |
//! | `log` | `entryAdded` |
//! | `input` | `fileDialogOpened` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::network::{AuthChallenge, Initiator, RequestData, ResponseData};
use crate::codec::{self, LogEntry, RealmInfo, RemoteValue, SharedReference, Source};
use crate::error::Result;
use crate::identifiers::{BrowsingContextId, NavigationId, RealmId, UserContextId};

use super::command::BrowsingContextInfo;

// ============================================================================
// EventKind
// ============================================================================

/// Every event the engine can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// `browsingContext.contextCreated`
    ContextCreated,
    /// `browsingContext.contextDestroyed`
    ContextDestroyed,
    /// `browsingContext.navigationStarted`
    NavigationStarted,
    /// `browsingContext.fragmentNavigated`
    FragmentNavigated,
    /// `browsingContext.historyUpdated`
    HistoryUpdated,
    /// `browsingContext.domContentLoaded`
    DomContentLoaded,
    /// `browsingContext.load`
    Load,
    /// `browsingContext.downloadWillBegin`
    DownloadWillBegin,
    /// `browsingContext.navigationAborted`
    NavigationAborted,
    /// `browsingContext.navigationCommitted`
    NavigationCommitted,
    /// `browsingContext.navigationFailed`
    NavigationFailed,
    /// `browsingContext.userPromptClosed`
    UserPromptClosed,
    /// `browsingContext.userPromptOpened`
    UserPromptOpened,
    /// `network.authRequired`
    AuthRequired,
    /// `network.beforeRequestSent`
    BeforeRequestSent,
    /// `network.fetchError`
    FetchError,
    /// `network.responseCompleted`
    ResponseCompleted,
    /// `network.responseStarted`
    ResponseStarted,
    /// `script.message`
    ScriptMessage,
    /// `script.realmCreated`
    RealmCreated,
    /// `script.realmDestroyed`
    RealmDestroyed,
    /// `log.entryAdded`
    LogEntryAdded,
    /// `input.fileDialogOpened`
    FileDialogOpened,
}

/// Decoder from raw event params to a typed event.
pub type EventDecoder = fn(&Value) -> Result<BidiEvent>;

impl EventKind {
    /// All registered kinds.
    pub const ALL: [Self; 23] = [
        Self::ContextCreated,
        Self::ContextDestroyed,
        Self::NavigationStarted,
        Self::FragmentNavigated,
        Self::HistoryUpdated,
        Self::DomContentLoaded,
        Self::Load,
        Self::DownloadWillBegin,
        Self::NavigationAborted,
        Self::NavigationCommitted,
        Self::NavigationFailed,
        Self::UserPromptClosed,
        Self::UserPromptOpened,
        Self::AuthRequired,
        Self::BeforeRequestSent,
        Self::FetchError,
        Self::ResponseCompleted,
        Self::ResponseStarted,
        Self::ScriptMessage,
        Self::RealmCreated,
        Self::RealmDestroyed,
        Self::LogEntryAdded,
        Self::FileDialogOpened,
    ];

    /// Looks up a kind by wire method name.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == method)
    }

    /// Returns the wire method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContextCreated => "browsingContext.contextCreated",
            Self::ContextDestroyed => "browsingContext.contextDestroyed",
            Self::NavigationStarted => "browsingContext.navigationStarted",
            Self::FragmentNavigated => "browsingContext.fragmentNavigated",
            Self::HistoryUpdated => "browsingContext.historyUpdated",
            Self::DomContentLoaded => "browsingContext.domContentLoaded",
            Self::Load => "browsingContext.load",
            Self::DownloadWillBegin => "browsingContext.downloadWillBegin",
            Self::NavigationAborted => "browsingContext.navigationAborted",
            Self::NavigationCommitted => "browsingContext.navigationCommitted",
            Self::NavigationFailed => "browsingContext.navigationFailed",
            Self::UserPromptClosed => "browsingContext.userPromptClosed",
            Self::UserPromptOpened => "browsingContext.userPromptOpened",
            Self::AuthRequired => "network.authRequired",
            Self::BeforeRequestSent => "network.beforeRequestSent",
            Self::FetchError => "network.fetchError",
            Self::ResponseCompleted => "network.responseCompleted",
            Self::ResponseStarted => "network.responseStarted",
            Self::ScriptMessage => "script.message",
            Self::RealmCreated => "script.realmCreated",
            Self::RealmDestroyed => "script.realmDestroyed",
            Self::LogEntryAdded => "log.entryAdded",
            Self::FileDialogOpened => "input.fileDialogOpened",
        }
    }

    /// Returns the protocol module the event belongs to.
    #[must_use]
    pub const fn module(self) -> &'static str {
        match self {
            Self::ContextCreated
            | Self::ContextDestroyed
            | Self::NavigationStarted
            | Self::FragmentNavigated
            | Self::HistoryUpdated
            | Self::DomContentLoaded
            | Self::Load
            | Self::DownloadWillBegin
            | Self::NavigationAborted
            | Self::NavigationCommitted
            | Self::NavigationFailed
            | Self::UserPromptClosed
            | Self::UserPromptOpened => "browsingContext",
            Self::AuthRequired
            | Self::BeforeRequestSent
            | Self::FetchError
            | Self::ResponseCompleted
            | Self::ResponseStarted => "network",
            Self::ScriptMessage | Self::RealmCreated | Self::RealmDestroyed => "script",
            Self::LogEntryAdded => "log",
            Self::FileDialogOpened => "input",
        }
    }

    /// Returns a short human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ContextCreated => "A browsing context was created",
            Self::ContextDestroyed => "A browsing context was destroyed",
            Self::NavigationStarted => "A navigation started",
            Self::FragmentNavigated => "A same-document fragment navigation happened",
            Self::HistoryUpdated => "The session history was updated",
            Self::DomContentLoaded => "DOMContentLoaded fired",
            Self::Load => "The load event fired",
            Self::DownloadWillBegin => "A download is about to start",
            Self::NavigationAborted => "A navigation was aborted",
            Self::NavigationCommitted => "A navigation was committed",
            Self::NavigationFailed => "A navigation failed",
            Self::UserPromptClosed => "A user prompt was closed",
            Self::UserPromptOpened => "A user prompt was opened",
            Self::AuthRequired => "A request requires authentication",
            Self::BeforeRequestSent => "A request is about to be sent",
            Self::FetchError => "A request failed",
            Self::ResponseCompleted => "A response body was fully received",
            Self::ResponseStarted => "Response headers were received",
            Self::ScriptMessage => "A preload script posted a channel message",
            Self::RealmCreated => "A script realm was created",
            Self::RealmDestroyed => "A script realm was destroyed",
            Self::LogEntryAdded => "A console or script log entry was added",
            Self::FileDialogOpened => "A file picker was opened",
        }
    }

    /// Returns `true` for `browsingContext` events.
    #[inline]
    #[must_use]
    pub fn is_browsing_context_event(self) -> bool {
        self.module() == "browsingContext"
    }

    /// Returns `true` for realm lifecycle events.
    #[inline]
    #[must_use]
    pub fn is_realm_event(self) -> bool {
        matches!(self, Self::RealmCreated | Self::RealmDestroyed)
    }

    /// Returns the decoder for this kind's params.
    #[must_use]
    pub fn decoder(self) -> EventDecoder {
        match self {
            Self::ContextCreated => |p| payload(Self::ContextCreated, p).map(BidiEvent::ContextCreated),
            Self::ContextDestroyed => {
                |p| payload(Self::ContextDestroyed, p).map(BidiEvent::ContextDestroyed)
            }
            Self::NavigationStarted => {
                |p| payload(Self::NavigationStarted, p).map(BidiEvent::NavigationStarted)
            }
            Self::FragmentNavigated => {
                |p| payload(Self::FragmentNavigated, p).map(BidiEvent::FragmentNavigated)
            }
            Self::HistoryUpdated => {
                |p| payload(Self::HistoryUpdated, p).map(BidiEvent::HistoryUpdated)
            }
            Self::DomContentLoaded => {
                |p| payload(Self::DomContentLoaded, p).map(BidiEvent::DomContentLoaded)
            }
            Self::Load => |p| payload(Self::Load, p).map(BidiEvent::Load),
            Self::DownloadWillBegin => {
                |p| payload(Self::DownloadWillBegin, p).map(BidiEvent::DownloadWillBegin)
            }
            Self::NavigationAborted => {
                |p| payload(Self::NavigationAborted, p).map(BidiEvent::NavigationAborted)
            }
            Self::NavigationCommitted => {
                |p| payload(Self::NavigationCommitted, p).map(BidiEvent::NavigationCommitted)
            }
            Self::NavigationFailed => {
                |p| payload(Self::NavigationFailed, p).map(BidiEvent::NavigationFailed)
            }
            Self::UserPromptClosed => {
                |p| payload(Self::UserPromptClosed, p).map(BidiEvent::UserPromptClosed)
            }
            Self::UserPromptOpened => {
                |p| payload(Self::UserPromptOpened, p).map(BidiEvent::UserPromptOpened)
            }
            Self::AuthRequired => |p| payload(Self::AuthRequired, p).map(BidiEvent::AuthRequired),
            Self::BeforeRequestSent => {
                |p| payload(Self::BeforeRequestSent, p).map(BidiEvent::BeforeRequestSent)
            }
            Self::FetchError => |p| payload(Self::FetchError, p).map(BidiEvent::FetchError),
            Self::ResponseCompleted => {
                |p| payload(Self::ResponseCompleted, p).map(BidiEvent::ResponseCompleted)
            }
            Self::ResponseStarted => {
                |p| payload(Self::ResponseStarted, p).map(BidiEvent::ResponseStarted)
            }
            Self::ScriptMessage => |p| payload(Self::ScriptMessage, p).map(BidiEvent::ScriptMessage),
            Self::RealmCreated => |p| codec::decode::<RealmInfo>(p).map(BidiEvent::RealmCreated),
            Self::RealmDestroyed => {
                |p| payload(Self::RealmDestroyed, p).map(BidiEvent::RealmDestroyed)
            }
            Self::LogEntryAdded => |p| codec::decode::<LogEntry>(p).map(BidiEvent::LogEntryAdded),
            Self::FileDialogOpened => {
                |p| payload(Self::FileDialogOpened, p).map(BidiEvent::FileDialogOpened)
            }
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn payload<T: DeserializeOwned>(kind: EventKind, params: &Value) -> Result<T> {
    codec::decode_as(kind.as_str(), params)
}

// ============================================================================
// BidiEvent
// ============================================================================

/// A decoded event.
#[derive(Debug, Clone, PartialEq)]
pub enum BidiEvent {
    /// `browsingContext.contextCreated`
    ContextCreated(BrowsingContextInfo),
    /// `browsingContext.contextDestroyed`
    ContextDestroyed(BrowsingContextInfo),
    /// `browsingContext.navigationStarted`
    NavigationStarted(NavigationInfo),
    /// `browsingContext.fragmentNavigated`
    FragmentNavigated(NavigationInfo),
    /// `browsingContext.historyUpdated`
    HistoryUpdated(HistoryUpdatedParams),
    /// `browsingContext.domContentLoaded`
    DomContentLoaded(NavigationInfo),
    /// `browsingContext.load`
    Load(NavigationInfo),
    /// `browsingContext.downloadWillBegin`
    DownloadWillBegin(DownloadWillBeginParams),
    /// `browsingContext.navigationAborted`
    NavigationAborted(NavigationInfo),
    /// `browsingContext.navigationCommitted`
    NavigationCommitted(NavigationInfo),
    /// `browsingContext.navigationFailed`
    NavigationFailed(NavigationInfo),
    /// `browsingContext.userPromptClosed`
    UserPromptClosed(UserPromptClosedParams),
    /// `browsingContext.userPromptOpened`
    UserPromptOpened(UserPromptOpenedParams),
    /// `network.authRequired`
    AuthRequired(ResponseParams),
    /// `network.beforeRequestSent`
    BeforeRequestSent(BeforeRequestSentParams),
    /// `network.fetchError`
    FetchError(FetchErrorParams),
    /// `network.responseCompleted`
    ResponseCompleted(ResponseParams),
    /// `network.responseStarted`
    ResponseStarted(ResponseParams),
    /// `script.message`
    ScriptMessage(MessageParams),
    /// `script.realmCreated`
    RealmCreated(RealmInfo),
    /// `script.realmDestroyed`
    RealmDestroyed(RealmDestroyedParams),
    /// `log.entryAdded`
    LogEntryAdded(LogEntry),
    /// `input.fileDialogOpened`
    FileDialogOpened(FileDialogInfo),
}

impl BidiEvent {
    /// Decodes raw params for a registered kind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Decode`] if the params do not match the
    /// kind's payload shape.
    #[inline]
    pub fn decode(kind: EventKind, params: &Value) -> Result<Self> {
        (kind.decoder())(params)
    }

    /// Returns the kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ContextCreated(_) => EventKind::ContextCreated,
            Self::ContextDestroyed(_) => EventKind::ContextDestroyed,
            Self::NavigationStarted(_) => EventKind::NavigationStarted,
            Self::FragmentNavigated(_) => EventKind::FragmentNavigated,
            Self::HistoryUpdated(_) => EventKind::HistoryUpdated,
            Self::DomContentLoaded(_) => EventKind::DomContentLoaded,
            Self::Load(_) => EventKind::Load,
            Self::DownloadWillBegin(_) => EventKind::DownloadWillBegin,
            Self::NavigationAborted(_) => EventKind::NavigationAborted,
            Self::NavigationCommitted(_) => EventKind::NavigationCommitted,
            Self::NavigationFailed(_) => EventKind::NavigationFailed,
            Self::UserPromptClosed(_) => EventKind::UserPromptClosed,
            Self::UserPromptOpened(_) => EventKind::UserPromptOpened,
            Self::AuthRequired(_) => EventKind::AuthRequired,
            Self::BeforeRequestSent(_) => EventKind::BeforeRequestSent,
            Self::FetchError(_) => EventKind::FetchError,
            Self::ResponseCompleted(_) => EventKind::ResponseCompleted,
            Self::ResponseStarted(_) => EventKind::ResponseStarted,
            Self::ScriptMessage(_) => EventKind::ScriptMessage,
            Self::RealmCreated(_) => EventKind::RealmCreated,
            Self::RealmDestroyed(_) => EventKind::RealmDestroyed,
            Self::LogEntryAdded(_) => EventKind::LogEntryAdded,
            Self::FileDialogOpened(_) => EventKind::FileDialogOpened,
        }
    }
}

// ============================================================================
// BrowsingContext Payloads
// ============================================================================

/// Params of navigation lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationInfo {
    /// Navigated context.
    pub context: BrowsingContextId,
    /// Navigation id, absent for some same-document navigations.
    #[serde(default)]
    pub navigation: Option<NavigationId>,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    /// URL being navigated to.
    pub url: String,
}

/// Params of `browsingContext.historyUpdated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryUpdatedParams {
    /// Context whose history changed.
    pub context: BrowsingContextId,
    /// New URL.
    pub url: String,
}

/// Params of `browsingContext.downloadWillBegin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadWillBeginParams {
    /// Navigation fields.
    #[serde(flatten)]
    pub navigation: NavigationInfo,
    /// Filename proposed by the browser.
    pub suggested_filename: String,
}

/// Params of `browsingContext.userPromptOpened`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptOpenedParams {
    /// Context showing the prompt.
    pub context: BrowsingContextId,
    /// Configured handler, e.g. `accept` or `ignore`.
    #[serde(default)]
    pub handler: Option<String>,
    /// Prompt text.
    pub message: String,
    /// Prompt kind: `alert`, `beforeunload`, `confirm` or `prompt`.
    #[serde(rename = "type")]
    pub prompt_type: String,
    /// Default value of a `prompt`.
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Params of `browsingContext.userPromptClosed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptClosedParams {
    /// Context that showed the prompt.
    pub context: BrowsingContextId,
    /// Whether the prompt was accepted.
    pub accepted: bool,
    /// Prompt kind.
    #[serde(rename = "type")]
    pub prompt_type: String,
    /// Text entered into a `prompt`.
    #[serde(default)]
    pub user_text: Option<String>,
}

// ============================================================================
// Network Payloads
// ============================================================================

/// Fields common to every network event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkBase {
    /// Originating context, absent for worker requests.
    #[serde(default)]
    pub context: Option<BrowsingContextId>,
    /// Whether an intercept blocked the request.
    #[serde(default)]
    pub is_blocked: bool,
    /// Navigation the request belongs to.
    #[serde(default)]
    pub navigation: Option<NavigationId>,
    /// Redirects followed so far.
    #[serde(default)]
    pub redirect_count: u32,
    /// The request.
    pub request: RequestData,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    /// Intercepts that matched, when blocked.
    #[serde(default)]
    pub intercepts: Option<Vec<String>>,
}

/// Params of `network.beforeRequestSent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeforeRequestSentParams {
    /// Common fields.
    #[serde(flatten)]
    pub base: NetworkBase,
    /// What started the request.
    #[serde(default)]
    pub initiator: Option<Initiator>,
}

/// Params of `network.responseStarted`, `network.responseCompleted` and
/// `network.authRequired`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseParams {
    /// Common fields.
    #[serde(flatten)]
    pub base: NetworkBase,
    /// The response.
    pub response: ResponseData,
    /// Challenges, for `authRequired`.
    #[serde(default)]
    pub auth_challenges: Option<Vec<AuthChallenge>>,
}

/// Params of `network.fetchError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchErrorParams {
    /// Common fields.
    #[serde(flatten)]
    pub base: NetworkBase,
    /// Browser error text.
    pub error_text: String,
}

// ============================================================================
// Script / Input Payloads
// ============================================================================

/// Params of `script.message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageParams {
    /// Channel id.
    pub channel: String,
    /// Posted value.
    pub data: RemoteValue,
    /// Realm and context that posted it.
    pub source: Source,
}

/// Params of `script.realmDestroyed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmDestroyedParams {
    /// Destroyed realm.
    pub realm: RealmId,
}

/// Params of `input.fileDialogOpened`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDialogInfo {
    /// Context showing the dialog.
    pub context: BrowsingContextId,
    /// Owning user context.
    #[serde(default)]
    pub user_context: Option<UserContextId>,
    /// `<input type=file>` element, when known.
    #[serde(default)]
    pub element: Option<SharedReference>,
    /// Whether several files may be chosen.
    pub multiple: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::LogLevel;

    #[test]
    fn test_registry_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_method(kind.as_str()), Some(kind));
            assert!(kind.as_str().starts_with(kind.module()));
            assert!(!kind.description().is_empty());
        }
    }

    #[test]
    fn test_unknown_method() {
        assert_eq!(EventKind::from_method("browsingContext.teleported"), None);
        assert_eq!(EventKind::from_method(""), None);
    }

    #[test]
    fn test_decode_load() {
        let event = BidiEvent::decode(
            EventKind::Load,
            &json!({ "context": "ctx-1", "navigation": "nav-1", "timestamp": 10, "url": "https://example.com/" }),
        )
        .expect("decode");
        assert_eq!(event.kind(), EventKind::Load);
        let BidiEvent::Load(info) = event else {
            panic!("expected load");
        };
        assert_eq!(info.context.as_str(), "ctx-1");
    }

    #[test]
    fn test_decode_download_will_begin() {
        let event = BidiEvent::decode(
            EventKind::DownloadWillBegin,
            &json!({
                "context": "ctx-1",
                "navigation": null,
                "timestamp": 1,
                "url": "https://example.com/a.zip",
                "suggestedFilename": "a.zip"
            }),
        )
        .expect("decode");
        let BidiEvent::DownloadWillBegin(params) = event else {
            panic!("expected downloadWillBegin");
        };
        assert_eq!(params.suggested_filename, "a.zip");
        assert!(params.navigation.navigation.is_none());
    }

    #[test]
    fn test_decode_log_entry_added() {
        let event = BidiEvent::decode(
            EventKind::LogEntryAdded,
            &json!({
                "type": "console",
                "level": "info",
                "source": { "realm": "r-1", "context": "ctx-7" },
                "text": "hi",
                "timestamp": 3,
                "method": "log",
                "args": []
            }),
        )
        .expect("decode");
        let BidiEvent::LogEntryAdded(entry) = event else {
            panic!("expected log entry");
        };
        assert_eq!(entry.level(), LogLevel::Info);
    }

    #[test]
    fn test_decode_log_entry_unknown_type_is_decode_error() {
        let err = BidiEvent::decode(
            EventKind::LogEntryAdded,
            &json!({ "type": "mystery", "level": "info", "source": { "realm": "r" }, "text": "", "timestamp": 0 }),
        )
        .expect_err("unknown type");
        assert!(err.is_decode());
    }

    #[test]
    fn test_decode_response_started() {
        let event = BidiEvent::decode(
            EventKind::ResponseStarted,
            &json!({
                "context": "ctx-1",
                "isBlocked": false,
                "navigation": null,
                "redirectCount": 0,
                "request": { "request": "req-1", "url": "https://example.com/", "method": "GET" },
                "timestamp": 2,
                "response": {
                    "url": "https://example.com/",
                    "protocol": "http/1.1",
                    "status": 200,
                    "statusText": "OK",
                    "fromCache": false,
                    "mimeType": "text/html",
                    "bytesReceived": 512
                }
            }),
        )
        .expect("decode");
        let BidiEvent::ResponseStarted(params) = event else {
            panic!("expected responseStarted");
        };
        assert_eq!(params.response.status, 200);
        assert_eq!(params.base.request.method, "GET");
    }

    #[test]
    fn test_decode_realm_created() {
        let event = BidiEvent::decode(
            EventKind::RealmCreated,
            &json!({ "type": "window", "realm": "r-1", "origin": "null", "context": "ctx-1" }),
        )
        .expect("decode");
        assert_eq!(event.kind(), EventKind::RealmCreated);
    }

    #[test]
    fn test_decode_shape_mismatch_names_event() {
        let err = BidiEvent::decode(EventKind::Load, &json!({ "context": 5 })).expect_err("bad shape");
        assert!(err.to_string().contains("browsingContext.load"));
    }
}
