//! Pipeline behavior of the generation orchestrator: stage order, caching,
//! cancellation, and single-flight supersession.

use parking_lot::Mutex;
use proptest::prelude::*;
use recipe_forge::orchestrator::RecipeListListener;
use recipe_forge::progress::{GenerationStage, ProgressBus, ProgressEvent};
use recipe_forge::types::GeneratedRecipe;
use recipe_forge::worker::{RecipeWorker, WorkerChannel};
use recipe_forge::{CacheStore, GenerationError, GenerationOrchestrator, GenerationRequest};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::integration::test_utils::{drain, request_events, stock, ScriptedSynthesis};

fn nasi_goreng() -> GenerationRequest {
    GenerationRequest::new("Nasi Goreng Spesial", "main-dish", 4)
        .with_preferred(["nasi", "telur"])
}

fn orchestrator(
    synthesis: Arc<ScriptedSynthesis>,
) -> (GenerationOrchestrator, UnboundedReceiver<ProgressEvent>) {
    let (bus, events) = ProgressBus::new_pair();
    let orchestrator = GenerationOrchestrator::builder(synthesis)
        .worker(WorkerChannel::spawn(RecipeWorker::default()))
        .inventory(vec![
            stock("ing-1", "Nasi putih", "gram", 12.0),
            stock("ing-2", "Telur ayam", "butir", 2_500.0),
        ])
        .user_id("owner-42")
        .progress_bus(bus)
        .build();
    (orchestrator, events)
}

fn stages(events: &[ProgressEvent]) -> Vec<Option<GenerationStage>> {
    events
        .iter()
        .map(|e| e.progress.as_ref().map(|p| p.stage))
        .collect()
}

#[tokio::test]
async fn first_request_walks_every_stage_then_repeat_hits_cache() {
    let synthesis = Arc::new(ScriptedSynthesis::new());
    let (orchestrator, mut events) = orchestrator(synthesis.clone());

    let recipe = orchestrator.generate(&nasi_goreng()).await.unwrap();
    assert_eq!(recipe.name, "Nasi Goreng Spesial");
    let hpp = recipe.hpp.as_ref().expect("inventory match should produce costs");
    assert!(hpp.total_material_cost > 0.0);

    let first = drain(&mut events);
    assert_eq!(
        stages(&first),
        vec![
            Some(GenerationStage::Validating),
            Some(GenerationStage::Matching),
            Some(GenerationStage::Generating),
            Some(GenerationStage::Calculating),
            Some(GenerationStage::Complete),
        ]
    );
    let percents: Vec<u8> = first
        .iter()
        .filter_map(|e| e.progress.as_ref().map(|p| p.progress))
        .collect();
    assert_eq!(percents, vec![10, 25, 40, 80, 100]);

    let again = orchestrator.generate(&nasi_goreng()).await.unwrap();
    assert_eq!(again, recipe);
    assert_eq!(stages(&drain(&mut events)), vec![Some(GenerationStage::Complete)]);
    assert_eq!(synthesis.calls(), 1);
    assert_eq!(orchestrator.cache().len(), 1);
}

#[tokio::test]
async fn reordered_ingredients_share_a_cache_entry() {
    let synthesis = Arc::new(ScriptedSynthesis::new());
    let (orchestrator, _events) = orchestrator(synthesis.clone());

    orchestrator.generate(&nasi_goreng()).await.unwrap();
    let reordered = GenerationRequest::new("  nasi goreng   spesial ", "main-dish", 4)
        .with_preferred(["Telur", "Nasi"]);
    orchestrator.generate(&reordered).await.unwrap();

    assert_eq!(synthesis.calls(), 1);
}

#[tokio::test]
async fn cancel_during_generating_clears_progress_and_caches_nothing() {
    let synthesis = Arc::new(ScriptedSynthesis::new().gated("Nasi Goreng Spesial"));
    let (orchestrator, mut events) = orchestrator(synthesis.clone());
    let orchestrator = Arc::new(orchestrator);

    let running = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.generate(&nasi_goreng()).await })
    };
    synthesis.started.notified().await;
    assert_eq!(
        orchestrator.progress().map(|p| p.stage),
        Some(GenerationStage::Generating)
    );
    assert!(orchestrator.is_generating());

    assert!(orchestrator.cancel());
    assert!(orchestrator.progress().is_none());

    let outcome = running.await.unwrap();
    assert!(matches!(outcome, Err(GenerationError::Cancelled)));
    assert!(orchestrator.progress().is_none());
    assert!(!orchestrator.is_generating());
    assert!(orchestrator.cache().is_empty());

    let emitted = drain(&mut events);
    let cleared: Vec<_> = emitted.iter().filter(|e| e.is_cleared()).collect();
    assert_eq!(cleared.len(), 1, "exactly one terminal cleared event");
    assert!(emitted.last().unwrap().is_cleared());
    assert!(!stages(&emitted).contains(&Some(GenerationStage::Complete)));
}

#[tokio::test]
async fn dropped_generate_future_clears_progress_once() {
    let synthesis = Arc::new(ScriptedSynthesis::new().gated("Nasi Goreng Spesial"));
    let (orchestrator, mut events) = orchestrator(synthesis.clone());

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        orchestrator.generate(&nasi_goreng()),
    )
    .await;
    assert!(timed_out.is_err());

    assert!(!orchestrator.is_generating());
    assert!(orchestrator.progress().is_none());
    assert!(orchestrator.cache().is_empty());

    let emitted = drain(&mut events);
    let cleared: Vec<_> = emitted.iter().filter(|e| e.is_cleared()).collect();
    assert_eq!(cleared.len(), 1);
    assert!(emitted.last().unwrap().is_cleared());

    // The orchestrator stays usable for the next request
    let soto = GenerationRequest::new("Soto Ayam", "main-dish", 4)
        .with_preferred(["ayam", "kunyit", "serai"]);
    orchestrator.generate(&soto).await.unwrap();
    assert_eq!(
        orchestrator.progress().map(|p| p.stage),
        Some(GenerationStage::Complete)
    );
}

#[tokio::test]
async fn newer_request_supersedes_the_one_in_flight() {
    let synthesis = Arc::new(ScriptedSynthesis::new().gated("Soto Ayam"));
    let (orchestrator, mut events) = orchestrator(synthesis.clone());
    let orchestrator = Arc::new(orchestrator);

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator
                .generate(
                    &GenerationRequest::new("Soto Ayam", "main-dish", 6)
                        .with_preferred(["ayam", "kunyit"]),
                )
                .await
        })
    };
    synthesis.started.notified().await;

    let second = orchestrator.generate(&nasi_goreng()).await.unwrap();
    assert_eq!(second.name, "Nasi Goreng Spesial");

    let first = first.await.unwrap();
    assert!(matches!(first, Err(GenerationError::Cancelled)));

    assert_eq!(
        orchestrator.progress().map(|p| p.stage),
        Some(GenerationStage::Complete)
    );
    assert_eq!(orchestrator.cache().len(), 1);

    let emitted = request_events(&drain(&mut events));
    let first_source = emitted[0].source;
    let first_events: Vec<_> = emitted.iter().filter(|e| e.source == first_source).collect();
    assert!(first_events.last().unwrap().is_cleared());
    assert_eq!(first_events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn synthesis_failure_reports_localized_error() {
    let synthesis = Arc::new(ScriptedSynthesis::new().failing("Nasi Goreng Spesial"));
    let (orchestrator, mut events) = orchestrator(synthesis);

    let err = orchestrator.generate(&nasi_goreng()).await.unwrap_err();
    assert!(matches!(err, GenerationError::SynthesisFailed(_)));

    let progress = orchestrator.progress().unwrap();
    assert_eq!(progress.stage, GenerationStage::Error);
    assert_eq!(progress.message, "Gagal membuat resep. Silakan coba lagi.");
    assert!(drain(&mut events).last().unwrap().is_terminal());
    assert!(orchestrator.cache().is_empty());
}

#[tokio::test]
async fn cached_hit_skips_authentication() {
    let synthesis = Arc::new(ScriptedSynthesis::new());
    let cache: Arc<dyn CacheStore> = Arc::new(recipe_forge::RecipeCache::default());
    let warm = GenerationOrchestrator::builder(synthesis.clone())
        .cache(Arc::clone(&cache))
        .worker(WorkerChannel::unavailable("not needed"))
        .user_id("owner-42")
        .build();
    warm.generate(&nasi_goreng()).await.unwrap();

    let anonymous = GenerationOrchestrator::builder(synthesis.clone())
        .cache(cache)
        .worker(WorkerChannel::unavailable("not needed"))
        .build();
    assert!(anonymous.generate(&nasi_goreng()).await.is_ok());
    assert_eq!(synthesis.calls(), 1);
}

#[derive(Default)]
struct RecordingListener {
    names: Mutex<Vec<String>>,
}

impl RecipeListListener for RecordingListener {
    fn recipes_changed(&self, recipe: &GeneratedRecipe) {
        self.names.lock().push(recipe.name.clone());
    }
}

#[tokio::test]
async fn listener_hears_fresh_recipes_only() {
    let listener = Arc::new(RecordingListener::default());
    let orchestrator = GenerationOrchestrator::builder(Arc::new(ScriptedSynthesis::new()))
        .worker(WorkerChannel::unavailable("not needed"))
        .user_id("owner-42")
        .listener(listener.clone())
        .build();

    orchestrator.generate(&nasi_goreng()).await.unwrap();
    orchestrator.generate(&nasi_goreng()).await.unwrap();

    assert_eq!(*listener.names.lock(), vec!["Nasi Goreng Spesial".to_string()]);
}

#[tokio::test]
async fn dispose_stops_the_worker() {
    let (orchestrator, _events) = orchestrator(Arc::new(ScriptedSynthesis::new()));
    assert!(orchestrator.worker().is_available());
    orchestrator.dispose();
    assert!(!orchestrator.worker().is_available());
    assert!(orchestrator.progress().is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Percentages never decrease within a request, whatever the servings
    #[test]
    fn progress_is_monotonic_within_a_request(servings in 1u32..50) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let emitted = runtime.block_on(async {
            let (orchestrator, mut events) = orchestrator(Arc::new(ScriptedSynthesis::new()));
            let request = GenerationRequest::new("Mie Goreng Jawa", "main-dish", servings)
                .with_preferred(["mie", "telur", "kol"]);
            orchestrator.generate(&request).await.unwrap();
            drain(&mut events)
        });
        let percents: Vec<u8> = emitted
            .iter()
            .filter_map(|e| e.progress.as_ref().map(|p| p.progress))
            .collect();
        prop_assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(percents.last().copied(), Some(100));
    }
}
