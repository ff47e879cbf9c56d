//! Reply correlation and failure handling on the worker channel.

use recipe_forge::worker::{TaskKind, WorkerChannel};
use recipe_forge::GenerationError;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_receive_their_own_replies() {
    let worker = Arc::new(WorkerChannel::spawn(
        |_kind: TaskKind, payload: Value| -> Result<Value, String> {
            let n = payload["n"].as_u64().ok_or("missing n")?;
            std::thread::sleep(Duration::from_millis(n % 3));
            Ok(json!({ "n": n, "square": n * n }))
        },
    ));

    let mut calls = JoinSet::new();
    for n in 0..32u64 {
        let worker = Arc::clone(&worker);
        calls.spawn(async move {
            let reply = worker
                .submit(TaskKind::CalculateCosts, json!({ "n": n }))
                .await
                .unwrap();
            (n, reply)
        });
    }

    let mut answered = 0;
    while let Some(joined) = calls.join_next().await {
        let (n, reply) = joined.unwrap();
        assert_eq!(reply["n"], json!(n));
        assert_eq!(reply["square"], json!(n * n));
        answered += 1;
    }
    assert_eq!(answered, 32);
    assert!(!worker.is_processing());
}

#[tokio::test]
async fn crash_rejects_every_pending_caller() {
    let worker = WorkerChannel::spawn(|_kind: TaskKind, payload: Value| -> Result<Value, String> {
        if payload["crash"].as_bool() == Some(true) {
            panic!("worker crashed");
        }
        std::thread::sleep(Duration::from_millis(5));
        Ok(payload)
    });

    let (crashed, queued_a, queued_b) = tokio::join!(
        worker.submit(TaskKind::CalculateCosts, json!({ "crash": true })),
        worker.submit(TaskKind::MatchIngredients, json!({ "crash": false })),
        worker.submit(TaskKind::GenerateVariations, json!({ "crash": false })),
    );

    for outcome in [crashed, queued_a, queued_b] {
        assert!(matches!(outcome, Err(GenerationError::WorkerUnavailable(_))));
    }
    assert!(!worker.is_available());
    assert_eq!(worker.pending_count(), 0);

    let later = worker.submit(TaskKind::CalculateCosts, json!({})).await;
    assert!(matches!(later, Err(GenerationError::WorkerUnavailable(_))));
}

#[tokio::test]
async fn cancelled_caller_leaves_other_tasks_untouched() {
    let worker = WorkerChannel::spawn(|_kind: TaskKind, payload: Value| -> Result<Value, String> {
        std::thread::sleep(Duration::from_millis(20));
        Ok(payload)
    });
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();

    let (cancelled, kept) = tokio::join!(
        worker.submit_cancellable(TaskKind::CalculateCosts, json!(1), &token),
        worker.submit(TaskKind::CalculateCosts, json!(2)),
    );

    assert!(matches!(cancelled, Err(GenerationError::Cancelled)));
    assert_eq!(kept.unwrap(), json!(2));
    assert!(worker.is_available());
}
