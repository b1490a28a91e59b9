//! Error types for the capmap pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CapmapError>;

#[derive(Debug, Error)]
pub enum CapmapError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid grid resolution {0}: expected 0..=15")]
    InvalidResolution(u8),

    #[error("Unknown experiment for forecast '{forecast_id}' and projection '{projection_id}'")]
    UnknownExperiment {
        forecast_id: String,
        projection_id: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
