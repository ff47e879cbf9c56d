//! Message-passing channel to the worker thread.
//!
//! Requests travel over a std channel to a dedicated OS thread; replies come
//! back over a tokio channel and a dispatcher task settles the matching
//! pending caller. If the thread dies, the reply channel closes and every
//! pending caller is rejected with `WorkerUnavailable`.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::GenerationError;
use crate::types::{
    AvailableIngredient, CostSummary, MatchedIngredient, RecipeIngredient, RecipeVariation,
};
use crate::worker::pending::PendingTasks;
use crate::worker::protocol::{
    CostCalculationInput, MatchIngredientsInput, TaskKind, VariationInput, WorkerReply,
    WorkerRequest,
};
use crate::worker::tasks::TaskHandler;

const WORKER_THREAD_NAME: &str = "recipe-worker";

pub struct WorkerChannel {
    outbound: Mutex<Option<Sender<WorkerRequest>>>,
    pending: Arc<Mutex<PendingTasks>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerChannel {
    /// Start a worker thread running `handler`.
    ///
    /// Must be called from within a tokio runtime. Initialization failures
    /// yield a channel that rejects every submission with `WorkerUnavailable`.
    pub fn spawn<H: TaskHandler>(handler: H) -> Self {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return Self::unavailable(format!("no async runtime for dispatcher: {}", e)),
        };

        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
        let (reply_tx, reply_rx) = unbounded_channel::<WorkerReply>();

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(handler, request_rx, reply_tx));
        if let Err(e) = spawned {
            error!(error = %e, "Failed to start worker thread");
            return Self::unavailable(format!("failed to start worker thread: {}", e));
        }

        let pending = Arc::new(Mutex::new(PendingTasks::new()));
        let dispatcher = runtime.spawn(dispatch_replies(reply_rx, pending.clone()));
        debug!("Worker channel started");

        Self {
            outbound: Mutex::new(Some(request_tx)),
            pending,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// A channel whose worker never came up
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(reason = %reason, "Worker channel unavailable");
        let mut pending = PendingTasks::new();
        pending.close(reason);
        Self {
            outbound: Mutex::new(None),
            pending: Arc::new(Mutex::new(pending)),
            dispatcher: Mutex::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        !self.pending.lock().is_closed()
    }

    /// Whether any submitted task is still waiting for its reply
    pub fn is_processing(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Send a task and wait for its reply
    pub async fn submit(&self, kind: TaskKind, payload: Value) -> Result<Value, GenerationError> {
        self.submit_inner(kind, payload, None).await
    }

    /// Like `submit`, but stops waiting once `token` is cancelled. A reply
    /// arriving afterwards is discarded.
    pub async fn submit_cancellable(
        &self,
        kind: TaskKind,
        payload: Value,
        token: &CancellationToken,
    ) -> Result<Value, GenerationError> {
        self.submit_inner(kind, payload, Some(token)).await
    }

    async fn submit_inner(
        &self,
        kind: TaskKind,
        payload: Value,
        token: Option<&CancellationToken>,
    ) -> Result<Value, GenerationError> {
        if token.is_some_and(|t| t.is_cancelled()) {
            return Err(GenerationError::Cancelled);
        }

        let (task_id, receiver) = self.pending.lock().register(kind)?;
        let request = WorkerRequest {
            task_id,
            task_kind: kind,
            payload,
        };

        let sent = match self.outbound.lock().as_ref() {
            Some(sender) => sender.send(request).is_ok(),
            None => false,
        };
        if !sent {
            self.pending.lock().remove(task_id);
            return Err(GenerationError::WorkerUnavailable(
                "worker is not accepting tasks".to_string(),
            ));
        }
        debug!(task_id = %task_id, task_kind = %kind, "Submitted worker task");

        let outcome = match token {
            Some(token) => {
                tokio::select! {
                    received = receiver => received,
                    _ = token.cancelled() => {
                        self.pending.lock().remove(task_id);
                        debug!(task_id = %task_id, task_kind = %kind, "Stopped waiting for cancelled worker task");
                        return Err(GenerationError::Cancelled);
                    }
                }
            }
            None => receiver.await,
        };

        outcome.unwrap_or_else(|_| {
            Err(GenerationError::WorkerUnavailable(
                "worker dropped the task".to_string(),
            ))
        })
    }

    async fn call<I, O>(
        &self,
        kind: TaskKind,
        input: &I,
        token: Option<&CancellationToken>,
    ) -> Result<O, GenerationError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let payload = serde_json::to_value(input)?;
        let data = self.submit_inner(kind, payload, token).await?;
        serde_json::from_value(data).map_err(|e| {
            GenerationError::WorkerTask(format!("Malformed {} result: {}", kind, e))
        })
    }

    pub async fn match_ingredients(
        &self,
        recipe_ingredients: &[RecipeIngredient],
        available: &[AvailableIngredient],
        token: Option<&CancellationToken>,
    ) -> Result<Vec<MatchedIngredient>, GenerationError> {
        let input = MatchIngredientsInput {
            recipe_ingredients: recipe_ingredients.to_vec(),
            available_ingredients: available.to_vec(),
        };
        self.call(TaskKind::MatchIngredients, &input, token).await
    }

    pub async fn calculate_costs(
        &self,
        input: &CostCalculationInput,
        token: Option<&CancellationToken>,
    ) -> Result<CostSummary, GenerationError> {
        self.call(TaskKind::CalculateCosts, input, token).await
    }

    pub async fn generate_variation(
        &self,
        input: &VariationInput,
        token: Option<&CancellationToken>,
    ) -> Result<RecipeVariation, GenerationError> {
        self.call(TaskKind::GenerateVariations, input, token).await
    }

    /// Stop the worker and reject anything still pending
    pub fn shutdown(&self) {
        let sender = self.outbound.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);
        let rejected = self.pending.lock().close("worker channel disposed");
        if let Some(dispatcher) = self.dispatcher.lock().take() {
            dispatcher.abort();
        }
        info!(rejected, "Worker channel shut down");
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<H: TaskHandler>(
    mut handler: H,
    requests: Receiver<WorkerRequest>,
    replies: UnboundedSender<WorkerReply>,
) {
    for request in requests {
        let reply = match handler.handle(request.task_kind, request.payload) {
            Ok(data) => WorkerReply::ok(request.task_id, request.task_kind, data),
            Err(message) => WorkerReply::failed(request.task_id, request.task_kind, message),
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
}

async fn dispatch_replies(
    mut replies: UnboundedReceiver<WorkerReply>,
    pending: Arc<Mutex<PendingTasks>>,
) {
    while let Some(reply) = replies.recv().await {
        pending.lock().resolve(reply);
    }
    let rejected = pending.lock().close("worker terminated unexpectedly");
    if rejected > 0 {
        error!(rejected, "Worker terminated with tasks in flight");
    } else {
        debug!("Worker reply channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::tasks::RecipeWorker;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn echo_round_trip() {
        let channel = WorkerChannel::spawn(|kind: TaskKind, payload: Value| -> Result<Value, String> {
            Ok(json!({ "kind": kind.as_str(), "payload": payload }))
        });
        let result = channel
            .submit(TaskKind::CalculateCosts, json!({ "n": 1 }))
            .await
            .unwrap();
        assert_eq!(result["kind"], "calculate-costs");
        assert_eq!(result["payload"]["n"], 1);
        assert!(!channel.is_processing());
    }

    #[tokio::test]
    async fn handler_error_rejects_only_that_task() {
        let channel = WorkerChannel::spawn(|kind: TaskKind, _payload: Value| -> Result<Value, String> {
            match kind {
                TaskKind::MatchIngredients => Err("no inventory".to_string()),
                _ => Ok(json!("ok")),
            }
        });
        let failed = channel.submit(TaskKind::MatchIngredients, json!({})).await;
        assert!(matches!(failed, Err(GenerationError::WorkerTask(_))));
        let ok = channel.submit(TaskKind::CalculateCosts, json!({})).await;
        assert_eq!(ok.unwrap(), json!("ok"));
        assert!(channel.is_available());
    }

    #[tokio::test]
    async fn panic_in_worker_makes_channel_unavailable() {
        let channel = WorkerChannel::spawn(|_kind: TaskKind, _payload: Value| -> Result<Value, String> {
            panic!("worker blew up")
        });
        let err = channel
            .submit(TaskKind::GenerateVariations, json!({}))
            .await
            .unwrap_err();
        assert!(err.is_worker_unavailable());

        // Dispatcher closes the table right after the reply channel drops
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!channel.is_available());
        let again = channel.submit(TaskKind::CalculateCosts, json!({})).await;
        assert!(again.unwrap_err().is_worker_unavailable());
    }

    #[tokio::test]
    async fn cancelled_wait_discards_late_reply() {
        let channel = WorkerChannel::spawn(|_kind: TaskKind, _payload: Value| -> Result<Value, String> {
            std::thread::sleep(Duration::from_millis(100));
            Ok(json!("late"))
        });
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = channel
            .submit_cancellable(TaskKind::CalculateCosts, json!({}), &token)
            .await;
        assert!(matches!(result, Err(GenerationError::Cancelled)));
        assert!(!channel.is_processing());
    }

    #[tokio::test]
    async fn shutdown_rejects_new_work() {
        let channel = WorkerChannel::spawn(RecipeWorker::default());
        channel.shutdown();
        assert!(!channel.is_available());
        let err = channel
            .submit(TaskKind::CalculateCosts, json!({}))
            .await
            .unwrap_err();
        assert!(err.is_worker_unavailable());
    }

    #[test]
    fn spawn_outside_runtime_is_unavailable() {
        let channel = WorkerChannel::spawn(RecipeWorker::default());
        assert!(!channel.is_available());
    }
}
