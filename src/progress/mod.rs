//! Progress observability primitives.

pub mod bus;
pub mod event;
pub mod tracker;

pub use bus::ProgressBus;
pub use event::{
    timestamp_now, BatchId, GenerationProgress, GenerationStage, ProgressEvent, ProgressSource,
    RequestId,
};
pub use tracker::{ProgressSnapshot, ProgressTracker};
