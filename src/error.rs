use thiserror::Error;

use crate::providers::ProviderKind;

/// Errors surfaced by the PawFinder service
#[derive(Error, Debug)]
pub enum PawFinderError {
    #[error("{0}")]
    ClientInput(String),

    #[error("{0} provider is not configured")]
    ProviderNotConfigured(ProviderKind),

    #[error("{provider} upstream error: {message}")]
    Upstream {
        provider: ProviderKind,
        message: String,
    },

    #[error("Model not available on server")]
    ModelUnavailable,

    #[error("Low confidence prediction ({confidence:.2}%) for '{breed}'")]
    LowConfidence { breed: String, confidence: f32 },

    #[error("Could not decode image: {0}")]
    ImageDecode(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis pool creation error: {0}")]
    PoolCreation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PawFinderError {
    /// True for errors caused by the caller's request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ClientInput(_) | Self::ProviderNotConfigured(_) | Self::LowConfidence { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PawFinderError>;
