//! Sequential batch runs over the orchestrator.

use recipe_forge::batch::{BatchRunner, NoDelay};
use recipe_forge::progress::{GenerationStage, ProgressBus, ProgressSource};
use recipe_forge::worker::WorkerChannel;
use recipe_forge::{GenerationOrchestrator, GenerationRequest};
use std::sync::Arc;

use crate::integration::test_utils::{drain, ScriptedSynthesis};

fn request(name: &str) -> GenerationRequest {
    GenerationRequest::new(name, "kue", 12).with_preferred(["tepung", "gula", "telur"])
}

#[tokio::test]
async fn failed_item_is_recorded_and_the_rest_complete() {
    let synthesis = Arc::new(ScriptedSynthesis::new().failing("Bika Ambon"));
    let (bus, mut events) = ProgressBus::new_pair();
    let orchestrator = Arc::new(
        GenerationOrchestrator::builder(synthesis.clone())
            .worker(WorkerChannel::unavailable("not needed"))
            .user_id("owner-42")
            .progress_bus(bus)
            .build(),
    );
    let runner = BatchRunner::new(orchestrator).with_pacing(Arc::new(NoDelay));

    let result = runner
        .run_batch(vec![
            request("Kue Lumpur"),
            request("Bika Ambon"),
            request("Klepon"),
        ])
        .await
        .unwrap();

    let names: Vec<&str> = result.successful.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Kue Lumpur", "Klepon"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].request.name, "Bika Ambon");
    assert!(result.failed[0].error.contains("upstream rejected Bika Ambon"));
    assert_eq!(result.total(), 3);
    assert_eq!(synthesis.seen(), vec!["Kue Lumpur", "Bika Ambon", "Klepon"]);

    let batch_events: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e.source, ProgressSource::Batch(_)))
        .filter_map(|e| e.progress)
        .collect();
    let percents: Vec<u8> = batch_events.iter().map(|p| p.progress).collect();
    assert_eq!(percents, vec![0, 33, 67, 100]);
    assert_eq!(batch_events[1].message, "Membuat resep 2 dari 3: Bika Ambon");
    let last = batch_events.last().unwrap();
    assert_eq!(last.stage, GenerationStage::Complete);
    assert_eq!(last.message, "Batch selesai: 2 berhasil, 1 gagal");
}

#[tokio::test]
async fn every_item_lands_in_exactly_one_bucket() {
    let synthesis = Arc::new(
        ScriptedSynthesis::new()
            .failing("Onde-onde")
            .failing("Serabi"),
    );
    let orchestrator = Arc::new(
        GenerationOrchestrator::builder(synthesis)
            .worker(WorkerChannel::unavailable("not needed"))
            .user_id("owner-42")
            .build(),
    );
    let runner = BatchRunner::new(orchestrator).with_pacing(Arc::new(NoDelay));
    let requests = vec![
        request("Onde-onde"),
        request("Lapis Legit"),
        request("Serabi"),
        request("Putu Ayu"),
        GenerationRequest::new("Nastar", "kue", 0),
    ];

    let result = runner.run_batch(requests.clone()).await.unwrap();

    assert_eq!(result.total(), requests.len());
    assert_eq!(result.successful.len(), 2);
    let failed: Vec<&str> = result.failed.iter().map(|f| f.request.name.as_str()).collect();
    assert_eq!(failed, vec!["Onde-onde", "Serabi", "Nastar"]);
}

#[tokio::test]
async fn repeated_items_are_served_from_cache() {
    let synthesis = Arc::new(ScriptedSynthesis::new());
    let orchestrator = Arc::new(
        GenerationOrchestrator::builder(synthesis.clone())
            .worker(WorkerChannel::unavailable("not needed"))
            .user_id("owner-42")
            .build(),
    );
    let runner = BatchRunner::new(orchestrator).with_pacing(Arc::new(NoDelay));

    let result = runner
        .run_batch(vec![request("Dadar Gulung"), request("Dadar Gulung")])
        .await
        .unwrap();

    assert!(result.all_succeeded());
    assert_eq!(synthesis.calls(), 1);
}
