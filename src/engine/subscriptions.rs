//! Ref-counted event subscriptions and listener dispatch.
//!
//! Many local listeners share one remote subscription per
//! `(EventKind, Scope)` pair. The first listener for a pair issues
//! `session.subscribe`; removing the last one issues `session.unsubscribe`.
//!
//! Transitions are serialized by an async mutex, so two concurrent adds for
//! the same pair send a single subscribe. Adds run to completion even when
//! the caller is cancelled. Dispatch does not take that mutex
//! and never waits on the network.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::identifiers::{BrowsingContextId, ListenerId, SubscriptionId, UserContextId};
use crate::protocol::{
    BidiCommand, BidiEvent, EmptyResult, EventKind, Subscribe, SubscribeResult, Unsubscribe,
};

use super::context::EventContext;
use super::correlator::Correlator;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked for every matching event.
pub type Listener = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// A decoded event together with the scope ids found in its params.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    /// Event kind.
    pub kind: EventKind,
    /// Typed payload.
    pub event: BidiEvent,
    /// Browsing and user context of the event, if any.
    pub context: EventContext,
}

// ============================================================================
// Scope
// ============================================================================

/// Set of contexts a listener is interested in.
///
/// An empty id set is the same as [`Scope::Global`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Events from every context.
    #[default]
    Global,
    /// Events whose browsing context is in the set.
    Contexts(BTreeSet<BrowsingContextId>),
    /// Events whose user context is in the set.
    UserContexts(BTreeSet<UserContextId>),
}

impl Scope {
    /// Scope limited to the given browsing contexts.
    pub fn contexts<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<BrowsingContextId>,
    {
        Self::Contexts(ids.into_iter().map(Into::into).collect()).normalized()
    }

    /// Scope limited to the given user contexts.
    pub fn user_contexts<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<UserContextId>,
    {
        Self::UserContexts(ids.into_iter().map(Into::into).collect()).normalized()
    }

    /// Collapses empty id sets to [`Scope::Global`].
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Contexts(ids) if ids.is_empty() => Self::Global,
            Self::UserContexts(ids) if ids.is_empty() => Self::Global,
            other => other,
        }
    }

    /// Returns `true` if an event with `context` falls inside this scope.
    #[must_use]
    pub fn matches(&self, context: &EventContext) -> bool {
        match self {
            Self::Global => true,
            Self::Contexts(ids) => context.context.as_ref().is_some_and(|id| ids.contains(id)),
            Self::UserContexts(ids) => context
                .user_context
                .as_ref()
                .is_some_and(|id| ids.contains(id)),
        }
    }

    fn subscribe_command(&self, kind: EventKind) -> Subscribe {
        let mut command = Subscribe::global([kind.as_str()]);
        match self {
            Self::Global => {}
            Self::Contexts(ids) => command.contexts = Some(ids.iter().cloned().collect()),
            Self::UserContexts(ids) => command.user_contexts = Some(ids.iter().cloned().collect()),
        }
        command
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Contexts(ids) => write!(f, "contexts({})", join(ids)),
            Self::UserContexts(ids) => write!(f, "user-contexts({})", join(ids)),
        }
    }
}

fn join<T: fmt::Display>(ids: &BTreeSet<T>) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

// ============================================================================
// SubscriptionHandle
// ============================================================================

/// Token returned by `add_listener`, consumed by `remove_listener`.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    listener: ListenerId,
    kind: EventKind,
    scope: Scope,
}

impl SubscriptionHandle {
    /// Returns the local listener id.
    #[inline]
    #[must_use]
    pub fn listener_id(&self) -> ListenerId {
        self.listener
    }

    /// Returns the event kind listened to.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the normalized scope.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

// ============================================================================
// Registry
// ============================================================================

type SubscriptionKey = (EventKind, Scope);

struct SubscriptionRecord {
    id: SubscriptionId,
    ref_count: usize,
}

struct ListenerEntry {
    id: ListenerId,
    scope: Scope,
    callback: Listener,
}

#[derive(Default)]
struct Registry {
    subscriptions: FxHashMap<SubscriptionKey, SubscriptionRecord>,
    listeners: FxHashMap<EventKind, Vec<ListenerEntry>>,
    next_listener: u64,
}

impl Registry {
    fn attach(&mut self, kind: EventKind, scope: Scope, callback: Listener) -> SubscriptionHandle {
        self.next_listener += 1;
        let id = ListenerId::new(self.next_listener);

        self.listeners.entry(kind).or_default().push(ListenerEntry {
            id,
            scope: scope.clone(),
            callback,
        });

        SubscriptionHandle {
            listener: id,
            kind,
            scope,
        }
    }

    fn detach(&mut self, handle: &SubscriptionHandle) -> bool {
        let Some(entries) = self.listeners.get_mut(&handle.kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != handle.listener);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(&handle.kind);
        }
        removed
    }
}

// ============================================================================
// SubscriptionManager
// ============================================================================

/// Owns subscription bookkeeping and the listener table.
pub(crate) struct SubscriptionManager {
    correlator: Arc<Correlator>,
    timeout: Duration,
    transitions: AsyncMutex<()>,
    registry: Mutex<Registry>,
}

impl SubscriptionManager {
    pub(crate) fn new(correlator: Arc<Correlator>, timeout: Duration) -> Self {
        Self {
            correlator,
            timeout,
            transitions: AsyncMutex::new(()),
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Registers a listener, subscribing remotely on the first one for the pair.
    ///
    /// The transition runs on its own task. If the caller stops waiting, the
    /// listener is removed again once the transition completes, so a remote
    /// subscription is never left without a record.
    ///
    /// # Errors
    ///
    /// Returns the subscribe failure; nothing is registered in that case.
    pub(crate) async fn add_listener(
        self: &Arc<Self>,
        kind: EventKind,
        scope: Scope,
        listener: Listener,
    ) -> Result<SubscriptionHandle> {
        let (sender, receiver) = oneshot::channel();
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let outcome = this.attach_listener(kind, scope, listener).await;
            if let Err(Ok(orphan)) = sender.send(outcome) {
                debug!(listener = %orphan.listener, %kind, "Caller went away, removing listener");
                if let Err(e) = this.remove_listener(orphan).await {
                    warn!(%kind, error = %e, "Failed to remove orphaned listener");
                }
            }
        });

        receiver.await?
    }

    async fn attach_listener(
        &self,
        kind: EventKind,
        scope: Scope,
        listener: Listener,
    ) -> Result<SubscriptionHandle> {
        let scope = scope.normalized();
        let key = (kind, scope.clone());
        let _transition = self.transitions.lock().await;

        let handle = {
            let mut registry = self.registry.lock();
            if let Some(record) = registry.subscriptions.get_mut(&key) {
                record.ref_count += 1;
                debug!(%kind, %scope, ref_count = record.ref_count, "Reusing subscription");
                return Ok(registry.attach(kind, scope, listener));
            }
            // Attached first so events sent right after the reply are not lost
            registry.attach(kind, scope.clone(), listener)
        };

        let command = scope.subscribe_command(kind);
        let outcome = self
            .correlator
            .send::<_, SubscribeResult>(Subscribe::METHOD, &command, self.timeout)
            .await;

        let mut registry = self.registry.lock();
        match outcome {
            Ok(result) => {
                info!(%kind, %scope, subscription = %result.subscription, "Subscribed");
                registry.subscriptions.insert(
                    key,
                    SubscriptionRecord {
                        id: result.subscription,
                        ref_count: 1,
                    },
                );
                Ok(handle)
            }
            Err(e) => {
                registry.detach(&handle);
                Err(e)
            }
        }
    }

    /// Removes a listener, unsubscribing remotely when it was the last one.
    ///
    /// # Errors
    ///
    /// Returns the unsubscribe failure. Local bookkeeping is removed
    /// either way.
    pub(crate) async fn remove_listener(&self, handle: SubscriptionHandle) -> Result<()> {
        let _transition = self.transitions.lock().await;

        let released = {
            let mut registry = self.registry.lock();
            if !registry.detach(&handle) {
                debug!(listener = %handle.listener, "Listener already removed");
                return Ok(());
            }

            let key = (handle.kind, handle.scope.clone());
            match registry.subscriptions.get_mut(&key) {
                Some(record) if record.ref_count > 1 => {
                    record.ref_count -= 1;
                    None
                }
                Some(_) => registry.subscriptions.remove(&key).map(|record| record.id),
                None => None,
            }
        };

        let Some(subscription) = released else {
            return Ok(());
        };

        let outcome = self
            .correlator
            .send::<_, EmptyResult>(
                Unsubscribe::METHOD,
                &Unsubscribe::one(subscription.clone()),
                self.timeout,
            )
            .await;

        match outcome {
            Ok(_) => {
                info!(kind = %handle.kind, scope = %handle.scope, %subscription, "Unsubscribed");
                Ok(())
            }
            Err(e) => {
                warn!(%subscription, error = %e, "Unsubscribe failed, dropping local record");
                Err(e)
            }
        }
    }

    /// Invokes every listener whose kind and scope match. Returns how many ran.
    pub(crate) fn dispatch(&self, envelope: &EventEnvelope) -> usize {
        let targets: Vec<(ListenerId, Listener)> = {
            let registry = self.registry.lock();
            registry
                .listeners
                .get(&envelope.kind)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|entry| entry.scope.matches(&envelope.context))
                        .map(|entry| (entry.id, Arc::clone(&entry.callback)))
                        .collect()
                })
                .unwrap_or_default()
        };

        for (id, callback) in &targets {
            if catch_unwind(AssertUnwindSafe(|| callback(envelope))).is_err() {
                error!(listener = %id, kind = %envelope.kind, "Listener panicked");
            }
        }

        targets.len()
    }

    /// Forgets every subscription and listener without contacting the remote end.
    pub(crate) fn clear(&self) {
        let mut registry = self.registry.lock();
        registry.subscriptions.clear();
        registry.listeners.clear();
    }

    #[inline]
    pub(crate) fn subscription_count(&self) -> usize {
        self.registry.lock().subscriptions.len()
    }

    #[inline]
    pub(crate) fn listener_count(&self) -> usize {
        self.registry.lock().listeners.values().map(Vec::len).sum()
    }
}

// ============================================================================
// Tests
// ============================================================================
