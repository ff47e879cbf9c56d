//! Integration tests for the recipe generation core

mod batch_runs;
mod config_loading;
mod orchestrator_pipeline;
mod test_utils;
mod worker_correlation;
