//! recipe-forge: costed recipe generation
//!
//! Async orchestration around an external recipe synthesis service: request
//! fingerprinting and caching, a staged pipeline with progress events and
//! single-flight cancellation, CPU-bound costing on a worker thread, and
//! paced batch runs.

pub mod batch;
pub mod cache;
pub mod cancellation;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod request;
pub mod synthesis;
pub mod types;
pub mod variation;
pub mod worker;

pub use batch::{BatchResult, BatchRunner, FailedItem, FixedDelay, NoDelay, PacingPolicy};
pub use cache::{CacheKey, CacheStore, RecipeCache};
pub use cancellation::CancellationSlot;
pub use error::GenerationError;
pub use orchestrator::{GenerationOrchestrator, OrchestratorConfig, RecipeListListener};
pub use progress::{GenerationProgress, GenerationStage, ProgressBus, ProgressEvent};
pub use request::GenerationRequest;
pub use synthesis::{HttpSynthesisClient, SynthesisClient};
pub use types::{AvailableIngredient, GeneratedRecipe, RecipeVariation, VariationKind};
pub use worker::{RecipeWorker, WorkerChannel};
