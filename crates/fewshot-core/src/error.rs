//! Error types for the few-shot mining core.
//!
//! Errors are organized by layer: configuration problems, and failures in
//! the label/train/predict cycle. Session-level errors carry enough context
//! (sample ids, label counts, dimensions) to surface a useful message.

use thiserror::Error;

/// Top-level error type for fewshot operations.
#[derive(Error, Debug)]
pub enum FewShotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors from the label/train/predict cycle
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the classifier, provider, and session state machine.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Training requires at least one example of each class
    #[error(
        "Insufficient labels: need at least one positive and one negative \
         (have {positives} positive, {negatives} negative)"
    )]
    InsufficientLabels { positives: usize, negatives: usize },

    /// Scoring was attempted before any successful fit
    #[error("Model has not been fitted; train before scoring")]
    NotFitted,

    /// The embedding provider could not produce an embedding
    #[error("Embedding unavailable for sample '{sample_id}': {message}")]
    EmbeddingUnavailable { sample_id: String, message: String },

    /// Embedding length differs from the fitted prototypes
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An in-flight inference run was invalidated by a newer training cycle
    #[error("Generation {generation} was superseded before inference completed")]
    StaleGeneration { generation: u64 },

    /// The session state machine rejected an operation
    #[error("Illegal session transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

/// Convenience type alias for fewshot results.
pub type Result<T> = std::result::Result<T, FewShotError>;

/// Convenience type alias for session-level results.
pub type SessionResult<T> = std::result::Result<T, SessionError>;
