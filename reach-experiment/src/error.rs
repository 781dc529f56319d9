use reach_core::UnknownFeedbackMode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Rejected configuration, raised before any shape or file is created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    UnknownFeedbackMode(#[from] UnknownFeedbackMode),

    #[error("unknown feedback transform {0:?}")]
    UnknownTransform(String),

    #[error("target ({nx}, {ny}) lies outside the unit square")]
    TargetOutOfRange { nx: f64, ny: f64 },

    #[error("canvas {width}x{height} leaves no room inside the clip margin")]
    CanvasTooSmall { width: u32, height: u32 },

    #[error("marker radius must be positive, got {0}")]
    InvalidMarkerRadius(f64),

    #[error("experiment has no blocks")]
    NoBlocks,

    #[error("block name {0:?} is used more than once")]
    DuplicateBlock(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
