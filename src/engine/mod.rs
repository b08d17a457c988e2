//! The BiDi protocol engine.
//!
//! An [`Engine`] sits on top of one [`Transport`] and provides:
//!
//! - Command correlation: ids, pending table, deadlines
//! - Ref-counted remote subscriptions shared by local listeners
//! - Routing of inbound frames to handles, listeners and the fault sink
//!
//! # Example
//!
//! ```no_run
//! use bidi_engine::{Engine, EngineConfig, EventKind, Scope, WebSocketOptions, WebSocketTransport};
//! use bidi_engine::protocol::SessionStatus;
//! use std::sync::Arc;
//!
//! # async fn example() -> bidi_engine::Result<()> {
//! let options = WebSocketOptions::new("ws://127.0.0.1:9222/session")?;
//! let transport = Arc::new(WebSocketTransport::connect(&options).await?);
//! let engine = Engine::new(transport, EngineConfig::default())?;
//!
//! let status = engine.send(SessionStatus {}).await?;
//! println!("ready: {}", status.ready);
//!
//! let handle = engine
//!     .add_listener(EventKind::LogEntryAdded, Scope::Global, |envelope| {
//!         println!("{:?}", envelope.event);
//!     })
//!     .await?;
//! engine.remove_listener(handle).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `context` | Browsing/user context extraction from raw params |
//! | `correlator` | Pending commands and [`CommandHandle`] |
//! | `subscriptions` | [`Scope`], listeners, subscription ref counts |
//! | `router` | Inbound frame classification and [`ProtocolFault`] |

// ============================================================================
// Submodules
// ============================================================================

pub mod context;
mod correlator;
mod router;
mod subscriptions;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::protocol::{BidiCommand, EventKind};
use crate::transport::Transport;

use correlator::Correlator;
use router::Router;
use subscriptions::SubscriptionManager;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::EventContext;
pub use correlator::CommandHandle;
pub use router::{FaultKind, ProtocolFault};
pub use subscriptions::{EventEnvelope, Listener, Scope, SubscriptionHandle};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for an engine.
struct EngineInner {
    transport: Arc<dyn Transport>,
    config: EngineConfig,
    correlator: Arc<Correlator>,
    subscriptions: Arc<SubscriptionManager>,
    router: Router,
    faults: broadcast::Sender<ProtocolFault>,
    shut_down: AtomicBool,
}

// ============================================================================
// Engine
// ============================================================================

/// Protocol engine bound to one transport.
///
/// Cheap to clone; clones share all state. Engines are constructed
/// explicitly and never live in globals.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

// ============================================================================
// Engine - Display
// ============================================================================

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("connected", &self.is_connected())
            .field("pending", &self.pending_count())
            .field("subscriptions", &self.subscription_count())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Engine - Constructor
// ============================================================================

impl Engine {
    /// Creates an engine and registers it with the transport.
    ///
    /// Frames that arrived before this call are not replayed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn new(transport: Arc<dyn Transport>, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let correlator = Correlator::new(Arc::clone(&transport), config.max_pending);
        let subscriptions = Arc::new(SubscriptionManager::new(
            Arc::clone(&correlator),
            config.subscribe_timeout,
        ));
        let (faults, _) = broadcast::channel(config.fault_capacity);
        let router = Router::new(
            Arc::clone(&correlator),
            Arc::clone(&subscriptions),
            faults.clone(),
        );

        let inner = Arc::new(EngineInner {
            transport: Arc::clone(&transport),
            config,
            correlator,
            subscriptions,
            router,
            faults,
            shut_down: AtomicBool::new(false),
        });

        // Weak refs avoid a transport/engine reference cycle
        let frames: Weak<EngineInner> = Arc::downgrade(&inner);
        transport.register_frame_listener(Arc::new(move |text: &str| {
            if let Some(inner) = frames.upgrade() {
                inner.router.on_frame(text);
            }
        }));

        let closes: Weak<EngineInner> = Arc::downgrade(&inner);
        transport.register_close_listener(Arc::new(move || {
            if let Some(inner) = closes.upgrade() {
                debug!("Transport closed");
                inner.shutdown();
            }
        }));

        debug!(
            command_timeout_ms = config.command_timeout.as_millis(),
            max_pending = config.max_pending,
            "Engine created"
        );

        Ok(Self { inner })
    }
}

// ============================================================================
// Engine - Accessors
// ============================================================================

impl Engine {
    /// Returns the engine configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns `true` while the transport is open and the engine is running.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.inner.shut_down.load(Ordering::SeqCst) && self.inner.transport.is_connected()
    }

    /// Returns the number of commands awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Returns the number of live remote subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.subscription_count()
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.listener_count()
    }
}

// ============================================================================
// Engine - Commands
// ============================================================================

impl Engine {
    /// Sends a typed command with the configured timeout.
    ///
    /// The frame is written before this returns; the handle resolves to the
    /// command's output.
    ///
    /// # Errors
    ///
    /// The handle resolves to [`Error::Config`] when called outside a Tokio
    /// runtime; nothing is written then.
    pub fn send<C: BidiCommand>(&self, command: C) -> CommandHandle<C::Output> {
        self.send_with_timeout(command, self.inner.config.command_timeout)
    }

    /// Sends a typed command with an explicit timeout.
    pub fn send_with_timeout<C: BidiCommand>(
        &self,
        command: C,
        timeout: Duration,
    ) -> CommandHandle<C::Output> {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return CommandHandle::failed(C::METHOD, Error::ConnectionClosed);
        }
        self.inner.correlator.send(C::METHOD, &command, timeout)
    }

    /// Sends an untyped command; the handle resolves to the raw `result`.
    ///
    /// `timeout` defaults to the configured command timeout.
    pub fn send_raw(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> CommandHandle<Value> {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return CommandHandle::failed(method, Error::ConnectionClosed);
        }
        let timeout = timeout.unwrap_or(self.inner.config.command_timeout);
        self.inner.correlator.send(method, &params, timeout)
    }
}

// ============================================================================
// Engine - Events
// ============================================================================

impl Engine {
    /// Registers a listener for one event kind within `scope`.
    ///
    /// The first listener for a `(kind, scope)` pair subscribes remotely;
    /// later ones share that subscription.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] after shutdown
    /// - Any failure of `session.subscribe`; nothing is registered then
    ///
    /// Dropping the returned future does not leak a subscription: the
    /// listener is removed again once the pending subscribe settles.
    pub async fn add_listener<F>(
        &self,
        kind: EventKind,
        scope: Scope,
        listener: F,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        self.inner
            .subscriptions
            .add_listener(kind, scope, Arc::new(listener))
            .await
    }

    /// Removes a listener, unsubscribing remotely if it was the last one
    /// for its pair.
    ///
    /// # Errors
    ///
    /// Returns the `session.unsubscribe` failure. The listener is removed
    /// regardless.
    pub async fn remove_listener(&self, handle: SubscriptionHandle) -> Result<()> {
        self.inner.subscriptions.remove_listener(handle).await
    }

    /// Subscribes to faults not tied to a pending command.
    ///
    /// Only faults published after this call are received.
    #[must_use]
    pub fn faults(&self) -> broadcast::Receiver<ProtocolFault> {
        self.inner.faults.subscribe()
    }
}

// ============================================================================
// Engine - Lifecycle
// ============================================================================

impl Engine {
    /// Fails every pending command with [`Error::ConnectionClosed`] and
    /// forgets all subscriptions.
    ///
    /// Called automatically when the transport closes. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl EngineInner {
    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.correlator.fail_all();
        self.subscriptions.clear();
        info!("Engine shut down");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::codec::LogEntry;
    use crate::identifiers::{BrowsingContextId, CommandId};
    use crate::protocol::{BidiEvent, SessionStatus};
    use crate::transport::MemoryTransport;

    fn setup() -> (Arc<MemoryTransport>, Engine) {
        setup_with(EngineConfig::default())
    }

    fn setup_with(config: EngineConfig) -> (Arc<MemoryTransport>, Engine) {
        let transport = Arc::new(MemoryTransport::new());
        let engine = Engine::new(transport.clone(), config).expect("engine");
        (transport, engine)
    }

    fn reply(transport: &MemoryTransport, id: CommandId, result: Value) {
        transport.inject_json(&json!({ "type": "success", "id": id, "result": result }));
    }

    /// Answers the next subscribe with `subscription`.
    async fn accept_subscribe(transport: &MemoryTransport, subscription: &str) -> Value {
        let frame = transport.next_sent_json().await.expect("subscribe frame");
        assert_eq!(frame["method"], "session.subscribe");
        transport.inject_json(&json!({
            "type": "success",
            "id": frame["id"],
            "result": { "subscription": subscription }
        }));
        frame
    }

    type Recorded = Arc<Mutex<Vec<EventEnvelope>>>;

    fn recorder() -> (Recorded, impl Fn(&EventEnvelope) + Send + Sync + 'static) {
        let seen: Recorded = Arc::default();
        let sink = Arc::clone(&seen);
        let listener = move |envelope: &EventEnvelope| sink.lock().push(envelope.clone());
        (seen, listener)
    }

    fn recorded(seen: &Recorded) -> Vec<EventEnvelope> {
        seen.lock().clone()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let transport = Arc::new(MemoryTransport::new());
        let err = Engine::new(transport, EngineConfig::new().with_max_pending(0)).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_session_status_success() {
        let (transport, engine) = setup();

        let handle = engine.send(SessionStatus {});
        let id = handle.id().expect("assigned id");

        let frame = transport.next_sent_json().await.expect("frame");
        assert_eq!(frame, json!({ "id": id, "method": "session.status", "params": {} }));

        reply(&transport, id, json!({ "ready": true }));
        let status = assert_ok!(handle.await);
        assert!(status.ready);
        assert!(status.message.is_empty());
        assert_eq!(engine.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_no_such_element_is_remote_fault() {
        let (transport, engine) = setup();

        let handle = engine.send_raw(
            "browsingContext.locateNodes",
            json!({ "context": "ctx-1", "locator": { "type": "css", "value": "#missing" } }),
            None,
        );
        let id = handle.id().expect("id");
        transport.inject_json(&json!({
            "type": "error",
            "id": id,
            "error": "no such element",
            "message": "Element not found"
        }));

        let err = assert_err!(handle.await);
        assert!(err.is_not_found());
        match err {
            Error::Remote { error, message, .. } => {
                assert_eq!(error, "no such element");
                assert_eq!(message, "Element not found");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_late_frame_ignored() {
        let (transport, engine) = setup();

        let handle = engine.send_with_timeout(SessionStatus {}, Duration::from_millis(50));
        let id = handle.id().expect("id");

        let err = assert_err!(handle.await);
        match err {
            Error::RequestTimeout { command_id, method, timeout_ms } => {
                assert_eq!(command_id, id);
                assert_eq!(method, "session.status");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("expected timeout, got {other:?}"),
        }

        reply(&transport, id, json!({ "ready": true, "message": "late" }));
        assert_eq!(engine.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends_get_unique_ids() {
        let (transport, engine) = setup();

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.send(SessionStatus {}).id() })
            })
            .collect();

        let mut ids = BTreeSet::new();
        for task in tasks {
            ids.insert(task.await.expect("join").expect("id"));
        }

        assert_eq!(ids.len(), 32);
        assert_eq!(transport.sent_count(), 32);
        assert_eq!(engine.pending_count(), 32);
    }

    #[tokio::test]
    async fn test_write_failure_rejects_and_clears() {
        let (transport, engine) = setup();
        transport.fail_writes(true);

        let err = assert_err!(engine.send(SessionStatus {}).await);
        assert!(err.is_connection_error());
        assert_eq!(engine.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_max_pending_guard() {
        let (_transport, engine) = setup_with(EngineConfig::new().with_max_pending(2));

        let _a = engine.send(SessionStatus {});
        let _b = engine.send(SessionStatus {});
        let err = assert_err!(engine.send(SessionStatus {}).await);
        assert!(matches!(err, Error::TooManyPending { pending: 2, max: 2 }));
    }

    #[tokio::test]
    async fn test_log_entry_routed_by_source_context() {
        let (transport, engine) = setup();
        let (seen, listener) = recorder();

        let (handle, frame) = tokio::join!(
            engine.add_listener(EventKind::LogEntryAdded, Scope::contexts(["ctx-7"]), listener),
            accept_subscribe(&transport, "sub-log"),
        );
        let _handle = handle.expect("listener");
        assert_eq!(
            frame["params"],
            json!({ "events": ["log.entryAdded"], "contexts": ["ctx-7"] })
        );

        transport.inject_json(&json!({
            "type": "event",
            "method": "log.entryAdded",
            "params": {
                "type": "console",
                "level": "info",
                "source": { "realm": "r-1", "context": "ctx-7" },
                "text": "hello",
                "timestamp": 1,
                "method": "log",
                "args": []
            }
        }));

        let events = recorded(&seen);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].context.context, Some(BrowsingContextId::new("ctx-7")));
        let BidiEvent::LogEntryAdded(LogEntry::Console(entry)) = &events[0].event else {
            panic!("expected console entry");
        };
        assert_eq!(entry.text.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_other_context_not_delivered() {
        let (transport, engine) = setup();
        let (seen, listener) = recorder();

        let (handle, _) = tokio::join!(
            engine.add_listener(EventKind::Load, Scope::contexts(["ctx-1"]), listener),
            accept_subscribe(&transport, "sub-load"),
        );
        handle.expect("listener");

        let load = |ctx: &str| {
            json!({
                "type": "event",
                "method": "browsingContext.load",
                "params": { "context": ctx, "navigation": "nav-1", "timestamp": 1, "url": "about:blank" }
            })
        };

        transport.inject_json(&load("ctx-2"));
        assert!(recorded(&seen).is_empty());

        transport.inject_json(&load("ctx-1"));
        assert_eq!(recorded(&seen).len(), 1);
    }

    #[tokio::test]
    async fn test_add_and_remove_round_trip() {
        let (transport, engine) = setup();
        let (_, first) = recorder();
        let (_, second) = recorder();

        let (a, _) = tokio::join!(
            engine.add_listener(EventKind::LogEntryAdded, Scope::Global, first),
            accept_subscribe(&transport, "sub-1"),
        );
        let a = a.expect("first");
        let b = engine
            .add_listener(EventKind::LogEntryAdded, Scope::Global, second)
            .await
            .expect("second reuses subscription");
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(engine.subscription_count(), 1);
        assert_eq!(engine.listener_count(), 2);

        engine.remove_listener(a).await.expect("remove first");
        assert_eq!(transport.sent_count(), 1);

        let remove = engine.remove_listener(b);
        let respond = async {
            let frame = transport.next_sent_json().await.expect("unsubscribe frame");
            assert_eq!(frame["method"], "session.unsubscribe");
            assert_eq!(frame["params"], json!({ "subscriptions": ["sub-1"] }));
            transport.inject_json(&json!({ "type": "success", "id": frame["id"], "result": {} }));
        };
        let (removed, ()) = tokio::join!(remove, respond);
        removed.expect("remove second");

        assert_eq!(engine.subscription_count(), 0);
        assert_eq!(engine.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_unsolicited_fault_reaches_sink() {
        let (transport, engine) = setup();
        let mut faults = engine.faults();

        transport.inject_json(&json!({
            "type": "error",
            "id": null,
            "error": "unknown error",
            "message": "something broke"
        }));

        let fault = faults.recv().await.expect("fault");
        assert_eq!(fault.kind, FaultKind::Unsolicited);
        assert!(fault.message.contains("something broke"));
    }

    #[tokio::test]
    async fn test_event_decode_fault_reaches_sink() {
        let (transport, engine) = setup();
        let mut faults = engine.faults();

        transport.inject_json(&json!({
            "type": "event",
            "method": "browsingContext.load",
            "params": { "context": "ctx-1" }
        }));

        let fault = faults.recv().await.expect("fault");
        assert_eq!(fault.kind, FaultKind::EventDecode);
        assert_eq!(fault.method.as_deref(), Some("browsingContext.load"));
    }

    #[tokio::test]
    async fn test_transport_close_fails_pending() {
        let (transport, engine) = setup();

        let handle = engine.send(SessionStatus {});
        transport.close();

        assert!(matches!(handle.await, Err(Error::ConnectionClosed)));
        assert!(!engine.is_connected());
        assert_eq!(engine.pending_count(), 0);

        assert!(matches!(
            engine.send(SessionStatus {}).await,
            Err(Error::ConnectionClosed)
        ));
        let err = engine
            .add_listener(EventKind::Load, Scope::Global, |_: &EventEnvelope| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_dropped_engine_ignores_frames() {
        let (transport, engine) = setup();
        drop(engine);

        transport.inject(r#"{"type":"success","id":1,"result":{}}"#);
        transport.close();
    }
}
