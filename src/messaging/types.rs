//! Application-facing message types.

use super::protocol::MessageId;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

/// Caller-observable execution status of a message: `None` until some member
/// reports execution, then the completion value the remote handler returned.
///
/// Each send starts from a cleared slot, so an old result from a previous send
/// of the same message object can never be mistaken for a new one.
#[derive(Clone, Default)]
pub struct ExecutionStatus {
    slot: Arc<Mutex<Option<Value>>>,
}

impl ExecutionStatus {
    pub fn get(&self) -> Option<Value> {
        self.slot.lock().unwrap().clone()
    }

    pub(crate) fn set(&self, value: Value) {
        *self.slot.lock().unwrap() = Some(value);
    }

    pub(crate) fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }

    /// Non-owning reference for the pending-ack table, so an in-flight entry
    /// never keeps a dropped message's slot alive.
    pub(crate) fn downgrade(&self) -> Weak<Mutex<Option<Value>>> {
        Arc::downgrade(&self.slot)
    }
}

/// An application message.
///
/// Created per send by the application; never persisted. The transport updates
/// `execution_status` asynchronously as ack packets arrive, and the sender
/// observes it by polling — there is no callback surface and no error for a
/// message that simply never executes (lost packet), only an eternally empty
/// status.
pub struct ClusterMessage {
    id: MessageId,
    handler: String,
    payload: Value,
    status: ExecutionStatus,
}

impl ClusterMessage {
    /// `handler` names the code registered on receiving members; `payload` is
    /// handed to it verbatim.
    pub fn new(handler: impl Into<String>, payload: Value) -> Self {
        Self {
            id: MessageId::new(),
            handler: handler.into(),
            payload,
            status: ExecutionStatus::default(),
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Current execution status. Re-querying never changes it.
    pub fn execution_status(&self) -> Option<Value> {
        self.status.get()
    }

    pub(crate) fn status_handle(&self) -> ExecutionStatus {
        self.status.clone()
    }

    /// The bounded wait/poll primitive for asynchronous delivery: polls the
    /// execution status with backoff until it is set or `timeout` elapses.
    /// This is the intended caller-side pattern for the best-effort transport;
    /// retry or give up after it returns `None`.
    pub async fn await_executed(&self, timeout: Duration) -> Option<Value> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_millis(10);

        loop {
            if let Some(value) = self.status.get() {
                return Some(value);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(backoff.min(deadline - Instant::now())).await;
            backoff = (backoff * 2).min(Duration::from_millis(250));
        }
    }
}

/// Sender-side table of in-flight messages, keyed by message id, so inbound
/// acks can be routed to the right status slot. Acks for unknown ids (a peer's
/// traffic, or a message the sender dropped) are ignored.
///
/// Entries never outlive their usefulness: the table holds weak references
/// (dropping the message drops the slot), the first ack removes its entry, and
/// entries whose sender is gone are pruned whenever a new message is tracked.
#[derive(Default)]
pub(crate) struct PendingAcks {
    inflight: DashMap<MessageId, Weak<Mutex<Option<Value>>>>,
}

impl PendingAcks {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn track(&self, id: MessageId, status: &ExecutionStatus) {
        self.inflight.retain(|_, slot| slot.strong_count() > 0);
        self.inflight.insert(id, status.downgrade());
    }

    /// Routes a JSON-encoded execution report to its message. The first report
    /// wins and retires the entry; later reports for the same id are ignored.
    pub(crate) fn complete(&self, id: &MessageId, result: &str) {
        let slot = match self.inflight.remove(id) {
            Some((_, slot)) => slot,
            None => return,
        };
        let slot = match slot.upgrade() {
            Some(slot) => slot,
            None => return,
        };
        match serde_json::from_str(result) {
            Ok(value) => *slot.lock().unwrap() = Some(value),
            Err(e) => {
                tracing::warn!("Undecodable execution report for {:?}: {}", id, e);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inflight.len()
    }
}
