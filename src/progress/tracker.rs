//! Per-request progress tracking.
//!
//! A tracker owns the progress of exactly one request: it keeps the reported
//! percentage non-decreasing, publishes to the bus, mirrors the latest value
//! into a shared snapshot, and lets only one terminal outcome through.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::progress::bus::ProgressBus;
use crate::progress::event::{GenerationProgress, GenerationStage, ProgressSource};

#[derive(Debug, Default)]
struct SnapshotState {
    owner: Option<ProgressSource>,
    progress: Option<GenerationProgress>,
}

/// Latest progress of whichever request currently owns it
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    state: Arc<RwLock<SnapshotState>>,
}

impl ProgressSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<GenerationProgress> {
        self.state.read().progress.clone()
    }

    pub fn owner(&self) -> Option<ProgressSource> {
        self.state.read().owner
    }

    /// Hand the snapshot to a new owner, discarding the previous value
    fn claim(&self, owner: ProgressSource) {
        let mut state = self.state.write();
        state.owner = Some(owner);
        state.progress = None;
    }

    fn set_if_owner(&self, owner: ProgressSource, progress: Option<GenerationProgress>) {
        let mut state = self.state.write();
        if state.owner == Some(owner) {
            state.progress = progress;
        }
    }

    /// Clear the snapshot only if `owner` still holds it
    pub fn clear_if_owner(&self, owner: ProgressSource) -> bool {
        let mut state = self.state.write();
        if state.owner == Some(owner) {
            state.progress = None;
            true
        } else {
            false
        }
    }

    /// Drop the current value but keep the owner, so an in-flight request
    /// keeps reporting into the snapshot.
    pub fn clear_value(&self) {
        self.state.write().progress = None;
    }

    /// Clear regardless of owner
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.owner = None;
        state.progress = None;
    }
}

pub struct ProgressTracker {
    source: ProgressSource,
    bus: Option<ProgressBus>,
    snapshot: Option<ProgressSnapshot>,
    last_percent: u8,
    finished: bool,
}

impl ProgressTracker {
    pub fn new(
        source: ProgressSource,
        bus: Option<ProgressBus>,
        snapshot: Option<ProgressSnapshot>,
    ) -> Self {
        if let Some(snapshot) = &snapshot {
            snapshot.claim(source);
        }
        Self {
            source,
            bus,
            snapshot,
            last_percent: 0,
            finished: false,
        }
    }

    pub fn source(&self) -> ProgressSource {
        self.source
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Enter a non-terminal stage at its default percentage
    pub fn stage(&mut self, stage: GenerationStage) {
        self.report(stage, stage.percent(), stage.default_message().to_string());
    }

    /// Report an intermediate value; percentages below the last reported one
    /// are raised to it.
    pub fn report(&mut self, stage: GenerationStage, percent: u8, message: impl Into<String>) {
        if self.finished {
            return;
        }
        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;
        self.publish(Some(GenerationProgress::new(stage, percent, message)));
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.last_percent = 100;
        self.publish(Some(GenerationProgress::new(
            GenerationStage::Complete,
            100,
            message,
        )));
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.publish(Some(GenerationProgress::new(GenerationStage::Error, 0, message)));
    }

    /// Terminal outcome for cancellation: progress becomes absent
    pub fn clear(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.publish(None);
    }

    fn publish(&self, progress: Option<GenerationProgress>) {
        if let Some(snapshot) = &self.snapshot {
            snapshot.set_if_owner(self.source, progress.clone());
        }
        if let Some(bus) = &self.bus {
            bus.emit(self.source, progress);
        }
    }
}
