//! Shared test utilities for integration tests
//!
//! Scripted synthesis clients and fixtures used across the pipeline and batch tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use recipe_forge::progress::{ProgressEvent, ProgressSource};
use recipe_forge::request::SynthesisPayload;
use recipe_forge::synthesis::SynthesisClient;
use recipe_forge::types::{AvailableIngredient, GeneratedRecipe, RecipeIngredient};
use recipe_forge::GenerationError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

pub fn ingredient(name: &str, quantity: f64, unit: &str) -> RecipeIngredient {
    RecipeIngredient {
        name: name.to_string(),
        quantity,
        unit: unit.to_string(),
        notes: None,
    }
}

pub fn stock(id: &str, name: &str, unit: &str, price_per_unit: f64) -> AvailableIngredient {
    AvailableIngredient {
        id: id.to_string(),
        name: name.to_string(),
        unit: unit.to_string(),
        price_per_unit,
        current_stock: 10_000.0,
    }
}

/// Synthesis client that answers from the payload, optionally failing or
/// stalling for specific product names.
#[derive(Default)]
pub struct ScriptedSynthesis {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    failing: HashSet<String>,
    gated: HashSet<String>,
    pub started: Notify,
    pub release: Notify,
}

impl ScriptedSynthesis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests named `name` fail with `SynthesisFailed`
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Requests named `name` signal `started` and then wait for `release`
    pub fn gated(mut self, name: &str) -> Self {
        self.gated.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl SynthesisClient for ScriptedSynthesis {
    async fn synthesize(
        &self,
        payload: SynthesisPayload,
    ) -> Result<GeneratedRecipe, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(payload.product_name.clone());

        if self.gated.contains(&payload.product_name) {
            self.started.notify_one();
            self.release.notified().await;
        }
        if self.failing.contains(&payload.product_name) {
            return Err(GenerationError::SynthesisFailed(format!(
                "upstream rejected {}",
                payload.product_name
            )));
        }

        let mut recipe = GeneratedRecipe::new(payload.product_name.clone());
        recipe.servings = Some(payload.servings);
        recipe.ingredients = vec![
            ingredient("Nasi putih", 800.0, "gram"),
            ingredient("Telur ayam", 4.0, "butir"),
            ingredient("Kecap manis", 30.0, "ml"),
        ];
        Ok(recipe)
    }
}

/// Everything currently queued on a progress receiver
pub fn drain(events: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Events whose source is a single request (not a batch)
pub fn request_events(events: &[ProgressEvent]) -> Vec<ProgressEvent> {
    events
        .iter()
        .filter(|e| matches!(e.source, ProgressSource::Request(_)))
        .cloned()
        .collect()
}
