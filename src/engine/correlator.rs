//! Command correlation.
//!
//! Every outbound command gets an id and a pending entry before its frame
//! is written. The entry is destroyed exactly once, by whichever comes
//! first:
//!
//! | Trigger | Handle resolves to |
//! |---------|--------------------|
//! | Success response with the id | decoded `result` |
//! | Error response with the id | [`Error::Remote`] |
//! | Deadline | [`Error::RequestTimeout`] |
//! | Connection shutdown | [`Error::ConnectionClosed`] |
//! | Write failure | the transport error |
//!
//! A frame for an id that is no longer pending is logged and ignored.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::{Request, Response};
use crate::transport::Transport;

// ============================================================================
// Types
// ============================================================================

type ResultSender = oneshot::Sender<Result<Value>>;

/// One unresolved command.
struct PendingCommand {
    method: String,
    sender: ResultSender,
    deadline: AbortHandle,
    timeout: Duration,
}

/// Id counter and pending entries, guarded together.
struct PendingTable {
    next_id: u64,
    entries: FxHashMap<CommandId, PendingCommand>,
}

// ============================================================================
// Correlator
// ============================================================================

/// Assigns ids, writes frames and resolves handles.
pub(crate) struct Correlator {
    transport: Arc<dyn Transport>,
    table: Mutex<PendingTable>,
    max_pending: usize,
    this: Weak<Correlator>,
}

impl Correlator {
    /// Creates a correlator writing to `transport`.
    pub(crate) fn new(transport: Arc<dyn Transport>, max_pending: usize) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            transport,
            table: Mutex::new(PendingTable {
                next_id: 1,
                entries: FxHashMap::default(),
            }),
            max_pending,
            this: this.clone(),
        })
    }

    /// Sends a command and returns a handle for its result.
    pub(crate) fn send<P, T>(&self, method: &str, params: &P, timeout: Duration) -> CommandHandle<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.dispatch(method, params, timeout) {
            Ok((id, receiver)) => CommandHandle::pending(id, method, receiver),
            Err(e) => CommandHandle::failed(method, e),
        }
    }

    fn dispatch<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> Result<(CommandId, oneshot::Receiver<Result<Value>>)> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::config("commands must be sent from within a Tokio runtime"))?;
        let (sender, receiver) = oneshot::channel();

        let (id, frame) = {
            let mut table = self.table.lock();

            if table.entries.len() >= self.max_pending {
                warn!(
                    pending = table.entries.len(),
                    max = self.max_pending,
                    "Too many pending commands"
                );
                return Err(Error::TooManyPending {
                    pending: table.entries.len(),
                    max: self.max_pending,
                });
            }

            let id = CommandId::new(table.next_id);
            table.next_id += 1;

            let frame = Request::new(id, method, params).to_frame()?;
            let deadline = self.spawn_deadline(&runtime, id, timeout);

            table.entries.insert(
                id,
                PendingCommand {
                    method: method.to_string(),
                    sender,
                    deadline,
                    timeout,
                },
            );

            (id, frame)
        };

        if let Err(e) = self.transport.send(frame) {
            if let Some(entry) = self.table.lock().entries.remove(&id) {
                entry.deadline.abort();
            }
            warn!(%id, method, error = %e, "Failed to write command");
            return Err(e);
        }

        trace!(%id, method, "Command sent");
        Ok((id, receiver))
    }

    fn spawn_deadline(&self, runtime: &Handle, id: CommandId, timeout: Duration) -> AbortHandle {
        let this = self.this.clone();
        runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(correlator) = this.upgrade() {
                correlator.expire(id);
            }
        })
        .abort_handle()
    }

    /// Resolves the pending command matching a response.
    pub(crate) fn resolve(&self, id: CommandId, response: Response) {
        let Some(entry) = self.table.lock().entries.remove(&id) else {
            warn!(%id, "Response for unknown or expired command, ignoring");
            return;
        };

        entry.deadline.abort();
        let result = response.into_result();

        match &result {
            Ok(_) => debug!(%id, method = %entry.method, "Command succeeded"),
            Err(e) => debug!(%id, method = %entry.method, error = %e, "Command failed"),
        }

        let _ = entry.sender.send(result);
    }

    fn expire(&self, id: CommandId) {
        let Some(entry) = self.table.lock().entries.remove(&id) else {
            return;
        };

        let timeout_ms = u64::try_from(entry.timeout.as_millis()).unwrap_or(u64::MAX);
        warn!(%id, method = %entry.method, timeout_ms, "Command timed out");
        let _ = entry
            .sender
            .send(Err(Error::request_timeout(id, entry.method, timeout_ms)));
    }

    /// Fails every pending command with [`Error::ConnectionClosed`].
    pub(crate) fn fail_all(&self) {
        let pending: Vec<_> = self.table.lock().entries.drain().collect();
        let count = pending.len();

        for (_, entry) in pending {
            entry.deadline.abort();
            let _ = entry.sender.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
    }

    /// Returns the number of pending commands.
    #[inline]
    pub(crate) fn pending_count(&self) -> usize {
        self.table.lock().entries.len()
    }
}

// ============================================================================
// CommandHandle
// ============================================================================

enum HandleState {
    Pending(oneshot::Receiver<Result<Value>>),
    Failed(Error),
    Done,
}

/// Awaitable result of one command.
///
/// Dropping the handle abandons the result; the engine still removes the
/// pending entry at its deadline.
#[must_use = "a command handle does nothing unless awaited"]
pub struct CommandHandle<T> {
    id: Option<CommandId>,
    method: String,
    state: HandleState,
    _output: PhantomData<fn() -> T>,
}

impl<T> CommandHandle<T> {
    fn pending(id: CommandId, method: &str, receiver: oneshot::Receiver<Result<Value>>) -> Self {
        Self {
            id: Some(id),
            method: method.to_string(),
            state: HandleState::Pending(receiver),
            _output: PhantomData,
        }
    }

    pub(crate) fn failed(method: &str, error: Error) -> Self {
        Self {
            id: None,
            method: method.to_string(),
            state: HandleState::Failed(error),
            _output: PhantomData,
        }
    }

    /// Returns the assigned command id, or `None` if the send failed.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<CommandId> {
        self.id
    }

    /// Returns the command method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl<T: DeserializeOwned> Future for CommandHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let outcome = match &mut this.state {
            HandleState::Pending(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(Ok(value))) => codec::decode_as::<T>(&this.method, &value),
                Poll::Ready(Ok(Err(e))) => Err(e),
                Poll::Ready(Err(e)) => Err(Error::ChannelClosed(e)),
            },
            HandleState::Failed(_) => match std::mem::replace(&mut this.state, HandleState::Done) {
                HandleState::Failed(e) => Err(e),
                _ => Err(Error::ConnectionClosed),
            },
            HandleState::Done => Err(Error::connection("command handle polled after completion")),
        };

        this.state = HandleState::Done;
        Poll::Ready(outcome)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::protocol::Frame;
    use crate::transport::MemoryTransport;

    fn setup(max_pending: usize) -> (Arc<MemoryTransport>, Arc<Correlator>) {
        let transport = Arc::new(MemoryTransport::new());
        let correlator = Correlator::new(transport.clone(), max_pending);
        (transport, correlator)
    }

    fn respond(correlator: &Correlator, text: &str) {
        match Frame::parse(text).expect("frame") {
            Frame::Response(response) => {
                let id = response.id.expect("id");
                correlator.resolve(id, response);
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let (transport, correlator) = setup(10);
        let a: CommandHandle<Value> = correlator.send("session.status", &json!({}), Duration::from_secs(5));
        let b: CommandHandle<Value> = correlator.send("session.status", &json!({}), Duration::from_secs(5));

        assert_eq!(a.id(), Some(CommandId::new(1)));
        assert_eq!(b.id(), Some(CommandId::new(2)));
        assert_eq!(transport.sent_count(), 2);
        assert_eq!(correlator.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_success_resolves_once() {
        let (_transport, correlator) = setup(10);
        let handle: CommandHandle<Value> = correlator.send("session.status", &json!({}), Duration::from_secs(5));

        respond(&correlator, r#"{"type":"success","id":1,"result":{"ready":true}}"#);
        // Duplicate frame is ignored
        respond(&correlator, r#"{"type":"success","id":1,"result":{"ready":false}}"#);

        let value = assert_ok!(handle.await);
        assert_eq!(value["ready"], json!(true));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_response_rejects() {
        let (_transport, correlator) = setup(10);
        let handle: CommandHandle<Value> =
            correlator.send("browsingContext.locateNodes", &json!({}), Duration::from_secs(5));

        respond(
            &correlator,
            r#"{"type":"error","id":1,"error":"no such element","message":"nothing"}"#,
        );

        let err = assert_err!(handle.await);
        assert!(err.is_remote());
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_result_decode_failure_rejects() {
        #[derive(Debug, serde::Deserialize)]
        struct Ready {
            #[allow(dead_code)]
            ready: bool,
        }

        let (_transport, correlator) = setup(10);
        let handle: CommandHandle<Ready> = correlator.send("session.status", &json!({}), Duration::from_secs(5));
        respond(&correlator, r#"{"type":"success","id":1,"result":{"ready":"yes"}}"#);

        let err = assert_err!(handle.await);
        assert!(err.is_decode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_rejects_and_removes_entry() {
        let (_transport, correlator) = setup(10);
        let handle: CommandHandle<Value> =
            correlator.send("session.status", &json!({}), Duration::from_millis(50));

        let err = assert_err!(handle.await);
        assert!(err.is_timeout());
        assert_eq!(correlator.pending_count(), 0);

        // Late frame is ignored
        respond(&correlator, r#"{"type":"success","id":1,"result":{}}"#);
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_handle_cleaned_at_deadline() {
        let (_transport, correlator) = setup(10);
        let handle: CommandHandle<Value> =
            correlator.send("session.status", &json!({}), Duration::from_millis(50));
        drop(handle);
        assert_eq!(correlator.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_max_pending() {
        let (_transport, correlator) = setup(1);
        let _first: CommandHandle<Value> = correlator.send("a.b", &json!({}), Duration::from_secs(5));
        let second: CommandHandle<Value> = correlator.send("a.b", &json!({}), Duration::from_secs(5));

        assert!(second.id().is_none());
        assert!(matches!(
            second.await,
            Err(Error::TooManyPending { pending: 1, max: 1 })
        ));
    }

    #[tokio::test]
    async fn test_write_failure_removes_entry() {
        let (transport, correlator) = setup(10);
        transport.fail_writes(true);

        let handle: CommandHandle<Value> = correlator.send("a.b", &json!({}), Duration::from_secs(5));
        let err = assert_err!(handle.await);
        assert!(err.is_connection_error());
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn test_send_outside_runtime_rejects() {
        let (transport, correlator) = setup(10);

        let handle: CommandHandle<Value> = correlator.send("a.b", &json!({}), Duration::from_secs(5));
        assert!(handle.id().is_none());
        assert_eq!(correlator.pending_count(), 0);
        assert_eq!(transport.sent_count(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let err = runtime.block_on(handle).expect_err("no runtime");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_fail_all() {
        let (_transport, correlator) = setup(10);
        let a: CommandHandle<Value> = correlator.send("a.b", &json!({}), Duration::from_secs(5));
        let b: CommandHandle<Value> = correlator.send("a.b", &json!({}), Duration::from_secs(5));

        correlator.fail_all();

        assert!(matches!(a.await, Err(Error::ConnectionClosed)));
        assert!(matches!(b.await, Err(Error::ConnectionClosed)));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_frame_shape() {
        let (transport, correlator) = setup(10);
        let _handle: CommandHandle<Value> =
            correlator.send("session.subscribe", &json!({ "events": ["log.entryAdded"] }), Duration::from_secs(5));

        let frame = transport.next_sent_json().await.expect("frame");
        assert_eq!(
            frame,
            json!({ "id": 1, "method": "session.subscribe", "params": { "events": ["log.entryAdded"] } })
        );
    }
}
