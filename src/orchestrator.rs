//! Generation orchestrator
//!
//! Drives one request at a time through the stage pipeline:
//! cache lookup, validating, matching, generating (synthesis), calculating
//! (worker costing), complete. Starting a request cancels whichever one is in
//! flight, so only the most recent request can complete.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, CacheStore, RecipeCache};
use crate::cancellation::CancellationSlot;
use crate::error::GenerationError;
use crate::progress::{
    GenerationProgress, GenerationStage, ProgressBus, ProgressSnapshot, ProgressSource,
    ProgressTracker, RequestId,
};
use crate::request::{GenerationRequest, SynthesisPayload};
use crate::synthesis::SynthesisClient;
use crate::types::{
    AvailableIngredient, CostSummary, GeneratedRecipe, RecipeIngredient, RecipeVariation,
    VariationKind,
};
use crate::variation;
use crate::worker::{CostCalculationInput, CostInputItem, RecipeWorker, WorkerChannel};

/// Notified after every freshly generated (not cached) recipe, so layers
/// caching the recipe list can invalidate.
pub trait RecipeListListener: Send + Sync {
    fn recipes_changed(&self, recipe: &GeneratedRecipe);
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard upper bound on one synthesis call
    pub synthesis_timeout: Duration,
    pub operational_cost_percent: f64,
    pub match_threshold: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            synthesis_timeout: Duration::from_millis(60_000),
            operational_cost_percent: 30.0,
            match_threshold: crate::worker::tasks::DEFAULT_MATCH_THRESHOLD,
        }
    }
}

struct ActiveRequest {
    id: RequestId,
    tracker: Arc<Mutex<ProgressTracker>>,
}

pub struct GenerationOrchestrator {
    synthesis: Arc<dyn SynthesisClient>,
    cache: Arc<dyn CacheStore>,
    worker: WorkerChannel,
    config: OrchestratorConfig,
    user_id: Option<String>,
    inventory: RwLock<Vec<AvailableIngredient>>,
    bus: Option<ProgressBus>,
    listener: Option<Arc<dyn RecipeListListener>>,
    slot: CancellationSlot,
    active: Mutex<Option<ActiveRequest>>,
    snapshot: ProgressSnapshot,
}

pub struct OrchestratorBuilder {
    synthesis: Arc<dyn SynthesisClient>,
    cache: Option<Arc<dyn CacheStore>>,
    worker: Option<WorkerChannel>,
    config: OrchestratorConfig,
    user_id: Option<String>,
    inventory: Vec<AvailableIngredient>,
    bus: Option<ProgressBus>,
    listener: Option<Arc<dyn RecipeListListener>>,
}

impl OrchestratorBuilder {
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn worker(mut self, worker: WorkerChannel) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn inventory(mut self, inventory: Vec<AvailableIngredient>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn progress_bus(mut self, bus: ProgressBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn RecipeListListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Finish construction. Without an explicit worker a `RecipeWorker`
    /// thread is started, which needs a tokio runtime.
    pub fn build(self) -> GenerationOrchestrator {
        let worker = match self.worker {
            Some(worker) => worker,
            None => WorkerChannel::spawn(RecipeWorker::new(self.config.match_threshold)),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(RecipeCache::default()) as Arc<dyn CacheStore>);
        GenerationOrchestrator {
            synthesis: self.synthesis,
            cache,
            worker,
            config: self.config,
            user_id: self.user_id,
            inventory: RwLock::new(self.inventory),
            bus: self.bus,
            listener: self.listener,
            slot: CancellationSlot::new(),
            active: Mutex::new(None),
            snapshot: ProgressSnapshot::new(),
        }
    }
}

impl GenerationOrchestrator {
    pub fn builder(synthesis: Arc<dyn SynthesisClient>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            synthesis,
            cache: None,
            worker: None,
            config: OrchestratorConfig::default(),
            user_id: None,
            inventory: Vec::new(),
            bus: None,
            listener: None,
        }
    }

    /// Run `request` through the pipeline.
    ///
    /// Supersedes any request already in flight. Returns `Cancelled` when this
    /// request is cancelled or superseded before it completes.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedRecipe, GenerationError> {
        let request_id = RequestId::next();
        let (token, tracker) = self.activate(request_id);
        let _guard = InFlight {
            orchestrator: self,
            request_id,
            tracker: tracker.clone(),
        };
        debug!(request_id = %request_id, name = %request.name, "Starting generation");

        let result = self.run_pipeline(request_id, request, &token, &tracker).await;

        match &result {
            Ok(recipe) => {
                info!(request_id = %request_id, recipe = %recipe.name, "Generation complete");
            }
            Err(err) if err.is_cancelled() => {
                tracker.lock().clear();
                info!(request_id = %request_id, "Generation cancelled");
            }
            Err(err) => {
                tracker.lock().fail(err.user_message());
                match err {
                    GenerationError::Validation(_) | GenerationError::Unauthenticated => {
                        warn!(request_id = %request_id, error = %err, "Generation rejected")
                    }
                    _ => error!(request_id = %request_id, error = %err, "Generation failed"),
                }
            }
        }

        result
    }

    async fn run_pipeline(
        &self,
        request_id: RequestId,
        request: &GenerationRequest,
        token: &CancellationToken,
        tracker: &Mutex<ProgressTracker>,
    ) -> Result<GeneratedRecipe, GenerationError> {
        let key = CacheKey::for_request(request);
        if let Some(cached) = self.cache.get(&key) {
            debug!(request_id = %request_id, cache_key = %key, "Serving recipe from cache");
            tracker
                .lock()
                .complete(GenerationStage::Complete.default_message());
            return Ok(cached);
        }

        tracker.lock().stage(GenerationStage::Validating);
        request.validate()?;
        let user_id = self.authenticated_user()?;

        ensure_live(token)?;
        tracker.lock().stage(GenerationStage::Matching);

        ensure_live(token)?;
        tracker.lock().stage(GenerationStage::Generating);
        let payload = SynthesisPayload::from_request(request, user_id);
        let mut recipe = self.synthesize(payload, token).await?;

        ensure_live(token)?;
        tracker.lock().stage(GenerationStage::Calculating);
        let servings = recipe.servings.unwrap_or(request.servings);
        if let Some(summary) = self
            .compute_costs(request_id, &recipe.ingredients, servings, token)
            .await?
        {
            recipe.hpp = Some(summary);
        }

        // A result that arrives after cancellation is never cached
        ensure_live(token)?;
        self.cache.put(key, recipe.clone());
        debug!(request_id = %request_id, cache_key = %key, "Cached generated recipe");
        if let Some(listener) = &self.listener {
            listener.recipes_changed(&recipe);
        }
        tracker
            .lock()
            .complete(GenerationStage::Complete.default_message());
        Ok(recipe)
    }

    fn authenticated_user(&self) -> Result<&str, GenerationError> {
        match self.user_id.as_deref().map(str::trim) {
            Some(user_id) if !user_id.is_empty() => Ok(user_id),
            _ => Err(GenerationError::Unauthenticated),
        }
    }

    async fn synthesize(
        &self,
        payload: SynthesisPayload,
        token: &CancellationToken,
    ) -> Result<GeneratedRecipe, GenerationError> {
        let timeout = self.config.synthesis_timeout;
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(GenerationError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.synthesis.synthesize(payload)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(GenerationError::SynthesisTimeout(timeout.as_millis() as u64)),
                }
            }
        }
    }

    /// Match against inventory and cost the recipe on the worker.
    ///
    /// `None` means no new figures: there is no inventory or the worker is
    /// unavailable, and the recipe keeps whatever synthesis supplied.
    async fn compute_costs(
        &self,
        request_id: RequestId,
        ingredients: &[RecipeIngredient],
        servings: u32,
        token: &CancellationToken,
    ) -> Result<Option<CostSummary>, GenerationError> {
        let inventory = self.inventory.read().clone();
        if inventory.is_empty() {
            debug!(request_id = %request_id, "No inventory; skipping cost calculation");
            return Ok(None);
        }

        let costed = async {
            let matched = self
                .worker
                .match_ingredients(ingredients, &inventory, Some(token))
                .await?;
            let input = CostCalculationInput {
                ingredients: matched
                    .into_iter()
                    .map(|m| CostInputItem {
                        price_per_unit: m.matched_id.as_ref().map(|_| m.price_per_unit),
                        name: m.name,
                        quantity: m.quantity,
                        unit: m.unit,
                        matched_id: m.matched_id,
                    })
                    .collect(),
                servings,
                operational_cost_percent: self.config.operational_cost_percent,
            };
            self.worker.calculate_costs(&input, Some(token)).await
        }
        .await;

        match costed {
            Ok(summary) => Ok(Some(summary)),
            Err(err) if err.is_worker_unavailable() => {
                warn!(
                    request_id = %request_id,
                    error = %err,
                    "Worker unavailable; keeping synthesis cost figures"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Cancel the in-flight request. Its progress becomes absent right away
    /// and whatever it computes afterwards is discarded.
    pub fn cancel(&self) -> bool {
        let Some(request_id) = self.slot.cancel() else {
            return false;
        };
        let active = {
            let mut active = self.active.lock();
            match active.as_ref() {
                Some(current) if current.id == request_id => active.take(),
                _ => None,
            }
        };
        if let Some(active) = active {
            active.tracker.lock().clear();
        }
        info!(request_id = %request_id, "Cancellation requested");
        true
    }

    /// Latest progress of the most recent request
    pub fn progress(&self) -> Option<GenerationProgress> {
        self.snapshot.get()
    }

    pub fn is_generating(&self) -> bool {
        self.slot.is_active()
    }

    pub fn is_worker_processing(&self) -> bool {
        self.worker.is_processing()
    }

    pub fn reset_progress(&self) {
        self.snapshot.clear_value();
    }

    /// Cancel any in-flight request and stop the worker
    pub fn dispose(&self) {
        self.cancel();
        self.worker.shutdown();
        self.snapshot.reset();
        debug!("Orchestrator disposed");
    }

    /// Best-effort variation of `recipe` using the current inventory
    pub async fn generate_variation(
        &self,
        recipe: &GeneratedRecipe,
        kind: VariationKind,
    ) -> Option<RecipeVariation> {
        let inventory = self.inventory.read().clone();
        variation::generate_variation(&self.worker, recipe, kind, &inventory).await
    }

    pub fn set_inventory(&self, inventory: Vec<AvailableIngredient>) {
        *self.inventory.write() = inventory;
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn worker(&self) -> &WorkerChannel {
        &self.worker
    }

    pub fn progress_bus(&self) -> Option<&ProgressBus> {
        self.bus.as_ref()
    }

    /// Take the slot and install a tracker for `request_id`, clearing the
    /// superseded one. Both happen under the `active` lock so concurrent
    /// callers agree on which request is current.
    fn activate(
        &self,
        request_id: RequestId,
    ) -> (CancellationToken, Arc<Mutex<ProgressTracker>>) {
        let mut active = self.active.lock();
        let token = self.slot.begin(request_id);
        let tracker = Arc::new(Mutex::new(ProgressTracker::new(
            ProgressSource::Request(request_id),
            self.bus.clone(),
            Some(self.snapshot.clone()),
        )));
        let previous = active.replace(ActiveRequest {
            id: request_id,
            tracker: tracker.clone(),
        });
        if let Some(previous) = previous {
            previous.tracker.lock().clear();
        }
        (token, tracker)
    }

    fn release(&self, request_id: RequestId) {
        self.slot.finish(request_id);
        let mut active = self.active.lock();
        if matches!(active.as_ref(), Some(current) if current.id == request_id) {
            *active = None;
        }
    }
}

/// Releases the slot when `generate` ends, including when its future is
/// dropped mid-flight. An abandoned request gets its cleared event here.
struct InFlight<'a> {
    orchestrator: &'a GenerationOrchestrator,
    request_id: RequestId,
    tracker: Arc<Mutex<ProgressTracker>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let abandoned = {
            let mut tracker = self.tracker.lock();
            let abandoned = !tracker.is_finished();
            tracker.clear();
            abandoned
        };
        if abandoned {
            info!(request_id = %self.request_id, "Generation abandoned by caller");
        }
        self.orchestrator.release(self.request_id);
    }
}

impl Drop for GenerationOrchestrator {
    fn drop(&mut self) {
        self.slot.cancel();
    }
}

fn ensure_live(token: &CancellationToken) -> Result<(), GenerationError> {
    if token.is_cancelled() {
        Err(GenerationError::Cancelled)
    } else {
        Ok(())
    }
}
