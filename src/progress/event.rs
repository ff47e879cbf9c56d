//! Event schema for generation progress.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Named step of the generation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStage {
    Validating,
    Matching,
    Generating,
    Calculating,
    Complete,
    Error,
}

impl GenerationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStage::Validating => "validating",
            GenerationStage::Matching => "matching",
            GenerationStage::Generating => "generating",
            GenerationStage::Calculating => "calculating",
            GenerationStage::Complete => "complete",
            GenerationStage::Error => "error",
        }
    }

    /// Percentage reported when the stage is entered
    pub fn percent(self) -> u8 {
        match self {
            GenerationStage::Validating => 10,
            GenerationStage::Matching => 25,
            GenerationStage::Generating => 40,
            GenerationStage::Calculating => 80,
            GenerationStage::Complete => 100,
            GenerationStage::Error => 0,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStage::Complete | GenerationStage::Error)
    }

    /// Default status line for the stage
    pub fn default_message(self) -> &'static str {
        match self {
            GenerationStage::Validating => "Memvalidasi input...",
            GenerationStage::Matching => "Mencocokkan bahan...",
            GenerationStage::Generating => "AI sedang membuat resep...",
            GenerationStage::Calculating => "Menghitung HPP...",
            GenerationStage::Complete => "Resep berhasil dibuat!",
            GenerationStage::Error => "Gagal membuat resep",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage, percentage (0-100), and status line of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub stage: GenerationStage,
    pub progress: u8,
    pub message: String,
}

impl GenerationProgress {
    pub fn new(stage: GenerationStage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            message: message.into(),
        }
    }

    pub fn at_stage(stage: GenerationStage) -> Self {
        Self::new(stage, stage.percent(), stage.default_message())
    }
}

/// Identifier of one top-level generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Identifier of one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(u64);

impl BatchId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        BatchId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// What an event reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ProgressSource {
    Request(RequestId),
    Batch(BatchId),
}

/// One emitted progress update. `progress: None` means the progress was
/// cleared (cancellation or explicit reset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub ts: String,
    pub seq: u64,
    pub source: ProgressSource,
    pub progress: Option<GenerationProgress>,
}

impl ProgressEvent {
    pub fn is_cleared(&self) -> bool {
        self.progress.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        match &self.progress {
            Some(progress) => progress.stage.is_terminal(),
            None => true,
        }
    }
}

/// RFC 3339 UTC timestamp with milliseconds, e.g. `2026-02-14T12:34:56.789Z`
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
