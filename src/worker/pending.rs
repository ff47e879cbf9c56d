//! Correlation table from in-flight task ids to their waiting callers.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::worker::protocol::{TaskId, TaskKind, WorkerReply};

pub type TaskOutcome = Result<Value, GenerationError>;

#[derive(Debug)]
struct PendingTask {
    kind: TaskKind,
    responder: oneshot::Sender<TaskOutcome>,
}

/// Pending submissions keyed by `{taskKind, taskId}`.
///
/// Once closed (worker crashed or channel disposed) every registered caller
/// has been rejected and new registrations fail immediately.
#[derive(Debug, Default)]
pub struct PendingTasks {
    entries: HashMap<TaskId, PendingTask>,
    closed: Option<String>,
}

impl PendingTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: TaskKind,
    ) -> Result<(TaskId, oneshot::Receiver<TaskOutcome>), GenerationError> {
        if let Some(reason) = &self.closed {
            return Err(GenerationError::WorkerUnavailable(reason.clone()));
        }
        let task_id = TaskId::next();
        let (responder, receiver) = oneshot::channel();
        self.entries.insert(task_id, PendingTask { kind, responder });
        Ok((task_id, receiver))
    }

    /// Settle the one caller the reply belongs to. Returns false when no
    /// caller is waiting (already cancelled or unknown id).
    pub fn resolve(&mut self, reply: WorkerReply) -> bool {
        let Some(pending) = self.entries.remove(&reply.task_id) else {
            debug!(
                task_id = %reply.task_id,
                task_kind = %reply.task_kind,
                "Discarding worker reply with no waiting caller"
            );
            return false;
        };

        let outcome = if pending.kind != reply.task_kind {
            warn!(
                task_id = %reply.task_id,
                expected = %pending.kind,
                actual = %reply.task_kind,
                "Worker reply kind does not match submission"
            );
            Err(GenerationError::WorkerTask(format!(
                "reply kind {} does not match submitted kind {}",
                reply.task_kind, pending.kind
            )))
        } else if reply.success {
            Ok(reply.data.unwrap_or(Value::Null))
        } else {
            Err(GenerationError::WorkerTask(
                reply
                    .error
                    .unwrap_or_else(|| "Worker task failed".to_string()),
            ))
        };

        // The caller may have stopped waiting; that is not an error here.
        let _ = pending.responder.send(outcome);
        true
    }

    /// Forget a caller that stopped waiting
    pub fn remove(&mut self, task_id: TaskId) -> bool {
        self.entries.remove(&task_id).is_some()
    }

    /// Reject every pending caller with `WorkerUnavailable` and refuse new ones
    pub fn close(&mut self, reason: impl Into<String>) -> usize {
        let reason = reason.into();
        let rejected = self.entries.len();
        for (_, pending) in self.entries.drain() {
            let _ = pending
                .responder
                .send(Err(GenerationError::WorkerUnavailable(reason.clone())));
        }
        if self.closed.is_none() {
            self.closed = Some(reason);
        }
        rejected
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, kind: TaskKind) -> usize {
        self.entries.values().filter(|p| p.kind == kind).count()
    }
}
