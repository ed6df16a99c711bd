//! Error type shared by every classifier operation

use thiserror::Error;

/// Errors that can occur while building or driving a classification session
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Feature mask enables {enabled} features but the model expects {expected}")]
    MaskMismatch { enabled: usize, expected: usize },

    #[error("Invalid feature mask: {0}")]
    InvalidMask(String),

    #[error("No bytes were accumulated before classification")]
    EmptyInput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reducing to the top {requested} features per class does not shrink the active set")]
    FeatureReductionNoop { requested: usize },

    #[error("Invalid feature reduction: {0}")]
    InvalidReduction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to write feature dump: {0}")]
    Dump(#[from] serde_json::Error),

    #[error("Unknown type name: {0}")]
    UnknownType(String),
}

/// Result type for classifier operations
pub type Result<T> = std::result::Result<T, ClassifierError>;
