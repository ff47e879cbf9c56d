//! Sequential batch generation.
//!
//! Items run one at a time through the orchestrator in input order. An item
//! that fails is recorded with its error and the batch moves on; only an empty
//! input is rejected outright.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::orchestrator::GenerationOrchestrator;
use crate::progress::{BatchId, GenerationStage, ProgressBus, ProgressSource, ProgressTracker};
use crate::request::GenerationRequest;
use crate::types::GeneratedRecipe;

pub const DEFAULT_INTER_ITEM_DELAY: Duration = Duration::from_millis(1000);

/// Decides how long to wait between two batch items
#[async_trait]
pub trait PacingPolicy: Send + Sync {
    /// Called after item `completed` of `total` (1-based), never after the last
    async fn pause(&self, completed: usize, total: usize);
}

/// Fixed wait between items, for external rate limits
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        FixedDelay(DEFAULT_INTER_ITEM_DELAY)
    }
}

#[async_trait]
impl PacingPolicy for FixedDelay {
    async fn pause(&self, _completed: usize, _total: usize) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl PacingPolicy for NoDelay {
    async fn pause(&self, _completed: usize, _total: usize) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    pub request: GenerationRequest,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub successful: Vec<GeneratedRecipe>,
    pub failed: Vec<FailedItem>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct BatchRunner {
    orchestrator: Arc<GenerationOrchestrator>,
    pacing: Arc<dyn PacingPolicy>,
    bus: Option<ProgressBus>,
}

impl BatchRunner {
    /// Runner with the default one-second pacing, reporting on the
    /// orchestrator's progress bus.
    pub fn new(orchestrator: Arc<GenerationOrchestrator>) -> Self {
        let bus = orchestrator.progress_bus().cloned();
        Self {
            orchestrator,
            pacing: Arc::new(FixedDelay::default()),
            bus,
        }
    }

    pub fn with_pacing(mut self, pacing: Arc<dyn PacingPolicy>) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_progress_bus(mut self, bus: ProgressBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub async fn run_batch(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<BatchResult, GenerationError> {
        if requests.is_empty() {
            return Err(GenerationError::EmptyBatch);
        }

        let batch_id = BatchId::next();
        let total = requests.len();
        let mut tracker =
            ProgressTracker::new(ProgressSource::Batch(batch_id), self.bus.clone(), None);
        let mut result = BatchResult::default();
        info!(batch_id = %batch_id, total, "Starting batch");

        for (index, request) in requests.into_iter().enumerate() {
            tracker.report(
                GenerationStage::Generating,
                batch_percent(index, total),
                format!("Membuat resep {} dari {}: {}", index + 1, total, request.name),
            );

            match self.orchestrator.generate(&request).await {
                Ok(recipe) => {
                    debug!(
                        batch_id = %batch_id,
                        item = index + 1,
                        recipe = %recipe.name,
                        "Batch item succeeded"
                    );
                    result.successful.push(recipe);
                }
                Err(err) => {
                    warn!(
                        batch_id = %batch_id,
                        item = index + 1,
                        error = %err,
                        "Batch item failed"
                    );
                    result.failed.push(FailedItem {
                        request,
                        error: err.to_string(),
                    });
                }
            }

            if index + 1 < total {
                self.pacing.pause(index + 1, total).await;
            }
        }

        tracker.complete(format!(
            "Batch selesai: {} berhasil, {} gagal",
            result.successful.len(),
            result.failed.len()
        ));
        info!(
            batch_id = %batch_id,
            successful = result.successful.len(),
            failed = result.failed.len(),
            "Batch finished"
        );
        Ok(result)
    }
}

/// `round(index / total * 100)`
fn batch_percent(index: usize, total: usize) -> u8 {
    ((index as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
