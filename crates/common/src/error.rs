//! Error types shared across Gestura crates.

use std::path::PathBuf;

/// Top-level error type for Gestura operations.
#[derive(Debug, thiserror::Error)]
pub enum GesturaError {
    #[error("Ingest error: {message}")]
    Ingest { message: String },

    #[error("Model error: {message}")]
    Model { message: String },

    #[error("Segmentation error: {message}")]
    Segmentation { message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GesturaError.
pub type GesturaResult<T> = Result<T, GesturaError>;

impl GesturaError {
    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest {
            message: msg.into(),
        }
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model {
            message: msg.into(),
        }
    }

    pub fn segmentation(msg: impl Into<String>) -> Self {
        Self::Segmentation {
            message: msg.into(),
        }
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error only rejects a single frame and the stream can go on.
    pub fn is_frame_rejection(&self) -> bool {
        matches!(self, Self::Ingest { .. } | Self::Model { .. })
    }
}
