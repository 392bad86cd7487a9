//! Fewshot Core - Embeddable few-shot sample mining library.
//!
//! Implements the learning core of an interactive mining loop: a user
//! labels a handful of samples as positive/negative, a lightweight
//! prototype classifier is trained on their embeddings, predictions are
//! produced for the whole collection, and the user iterates.
//!
//! # Architecture
//!
//! ```text
//! Labels → LabelStore → TrainingSession.train_and_label()
//!        → PrototypeClassifier fit → BatchInferenceEngine → PredictionSet
//! ```
//!
//! Embeddings come from an external [`provider::EmbeddingProvider`]; the
//! embedding models themselves (ResNet, CLIP, DINOv2, ...) are opaque to
//! this crate.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fewshot_core::{ClassifierParams, InferenceOptions, Label, TrainingSession};
//!
//! let mut session = TrainingSession::new(
//!     Arc::new(provider),
//!     collection,
//!     ClassifierParams::default(),
//!     InferenceOptions::default(),
//! )?;
//! session.start()?;
//! session.set_label("sample_1", Label::Positive)?;
//! session.set_label("sample_2", Label::Negative)?;
//! let predictions = session.train_and_label().await?;
//! let positives = session.tag_positives(0.5)?;
//! ```

// Module declarations
pub mod classifier;
pub mod config;
pub mod error;
pub mod inference;
pub mod labels;
pub mod math;
pub mod provider;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use classifier::{create_model, ClassifierParams, Model, RocchioPrototypeModel, Scorer};
pub use config::Config;
pub use error::{ConfigError, FewShotError, Result, SessionError, SessionResult};
pub use inference::{BatchInferenceEngine, CancelFlag, InferenceOptions};
pub use labels::{Label, LabelStore};
pub use provider::{EmbeddingProvider, MemoryEmbeddingProvider};
pub use session::{SessionState, TrainingSession};
pub use types::{
    Embedding, EmbeddingRecord, Generation, LabelRecord, Prediction, PredictionRecord,
    PredictionSet, SampleId,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
