//! Classifier capability interface and model factory.
//!
//! Models implement [`Model`] (fit, score, params); the session only ever
//! talks to `Box<dyn Model>`, so new classifier types plug in by adding a
//! factory arm. Only the prototype/Rocchio family is implemented today.

mod prototype;

pub use prototype::{CentroidMode, PrototypeSnapshot, RocchioPrototypeModel};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ConfigError, SessionResult};
use crate::labels::Label;
use crate::types::{Embedding, SampleId};

/// Hyperparameters for fitting and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Centroid-computation variant ("mean" or "rocchio")
    pub mode: String,

    /// Weight on the target class mean (Rocchio mode)
    pub beta: f32,

    /// Weight on the subtracted opposite-class mean (Rocchio mode)
    pub gamma: f32,

    /// Score sharpness; smaller values saturate confidences faster
    pub temperature: f32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            mode: "rocchio".to_string(),
            beta: 1.0,
            gamma: 0.25,
            temperature: 1.0,
        }
    }
}

/// An embedding labeled for training (positive or negative only).
pub type LabeledEmbedding = (Embedding, Label);

/// An immutable fitted-model snapshot that can score embeddings.
///
/// Snapshots are shared behind `Arc` so an inference run keeps scoring
/// against a consistent model even if the session refits concurrently.
pub trait Scorer: Send + Sync {
    /// Score one embedding, returning a confidence in (0, 1).
    fn score(&self, embedding: &[f32]) -> SessionResult<f32>;

    /// Dimensionality the snapshot was fitted with.
    fn dim(&self) -> usize;
}

/// Trait that all classifier types implement.
pub trait Model: std::fmt::Debug + Send + Sync {
    /// Model type name for logging (e.g., "rocchio-prototype").
    fn name(&self) -> &str;

    /// The hyperparameters this model was created with.
    fn params(&self) -> &ClassifierParams;

    /// Fit the model on the labeled set, replacing any prior fitted state.
    fn fit(&mut self, labeled: &BTreeMap<SampleId, LabeledEmbedding>) -> SessionResult<()>;

    /// Score one embedding against the current fitted state.
    fn score(&self, embedding: &[f32]) -> SessionResult<f32>;

    /// The current immutable snapshot, for use across an inference run.
    fn fitted(&self) -> SessionResult<Arc<dyn Scorer>>;
}

/// Create a model from hyperparameters.
///
/// The `mode` field selects the variant; unknown modes are configuration
/// errors so a typo fails before any training happens.
pub fn create_model(params: &ClassifierParams) -> Result<Box<dyn Model>, ConfigError> {
    let mode = CentroidMode::parse(&params.mode)?;
    Ok(Box::new(RocchioPrototypeModel::new(mode, params.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model_known_modes() {
        for mode in ["mean", "rocchio"] {
            let params = ClassifierParams {
                mode: mode.to_string(),
                ..Default::default()
            };
            let model = create_model(&params).unwrap();
            assert_eq!(model.name(), "rocchio-prototype");
        }
    }

    #[test]
    fn test_create_model_unknown_mode() {
        let params = ClassifierParams {
            mode: "svm".to_string(),
            ..Default::default()
        };
        let err = create_model(&params).unwrap_err();
        assert!(err.to_string().contains("svm"));
    }

    #[test]
    fn test_default_params() {
        let params = ClassifierParams::default();
        assert_eq!(params.mode, "rocchio");
        assert!((params.beta - 1.0).abs() < f32::EPSILON);
        assert!((params.gamma - 0.25).abs() < f32::EPSILON);
        assert!((params.temperature - 1.0).abs() < f32::EPSILON);
    }
}
