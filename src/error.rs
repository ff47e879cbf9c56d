//! Error types for the recipe generation core.

use thiserror::Error;

/// Errors surfaced by generation, worker offload, and batch runs
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid generation request: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Caller is not authenticated")]
    Unauthenticated,

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Synthesis timed out after {0} ms")]
    SynthesisTimeout(u64),

    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Worker task failed: {0}")]
    WorkerTask(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Batch contains no requests")]
    EmptyBatch,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    pub fn validation(message: impl Into<String>) -> Self {
        GenerationError::Validation(vec![message.into()])
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationError::Cancelled)
    }

    pub fn is_worker_unavailable(&self) -> bool {
        matches!(self, GenerationError::WorkerUnavailable(_))
    }

    /// Message shown to end users in the terminal `error` progress event.
    ///
    /// The product audience is Indonesian small-business owners, so these are
    /// localized rather than the developer-facing `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Validation(problems) => match problems.first() {
                Some(first) => format!("Data resep tidak valid: {}", first),
                None => "Data resep tidak valid".to_string(),
            },
            GenerationError::Unauthenticated => {
                "Sesi Anda telah berakhir. Silakan login kembali.".to_string()
            }
            GenerationError::SynthesisFailed(_) => {
                "Gagal membuat resep. Silakan coba lagi.".to_string()
            }
            GenerationError::SynthesisTimeout(_) => {
                "Waktu pembuatan resep habis. Silakan coba lagi.".to_string()
            }
            GenerationError::WorkerUnavailable(_) | GenerationError::WorkerTask(_) => {
                "Perhitungan biaya tidak tersedia saat ini.".to_string()
            }
            GenerationError::Cancelled => "Pembuatan resep dibatalkan.".to_string(),
            GenerationError::EmptyBatch => "Tidak ada resep untuk dibuat.".to_string(),
            GenerationError::Config(_)
            | GenerationError::Serialization(_)
            | GenerationError::Io(_) => "Terjadi kesalahan saat membuat resep.".to_string(),
        }
    }
}

impl From<config::ConfigError> for GenerationError {
    fn from(err: config::ConfigError) -> Self {
        GenerationError::Config(err.to_string())
    }
}
