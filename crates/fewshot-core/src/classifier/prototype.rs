//! Centroid-based prototype classifier with optional Rocchio weighting.
//!
//! Fitting computes one centroid per class from the labeled embeddings.
//! Scoring measures the cosine-similarity margin between an embedding and
//! the two centroids, then squashes it through a temperature-scaled sigmoid
//! into a confidence in (0, 1).
//!
//! Centroid formulas:
//! - `mean`:    `centroid_c = mean(class c)`
//! - `rocchio`: `centroid_c = beta * mean(class c) - gamma * mean(opposite)`
//!
//! Cosine similarity is scale-invariant, so centroids are stored
//! unnormalized.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{SessionError, SessionResult};
use crate::labels::Label;
use crate::math::{cosine_similarity, mean_vector};
use crate::types::SampleId;

use super::{ClassifierParams, LabeledEmbedding, Model, Scorer};

/// Centroid-computation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentroidMode {
    /// Plain per-class mean
    Mean,
    /// Weighted mean minus scaled opposite-class mean
    Rocchio,
}

impl CentroidMode {
    /// Parse a mode string from config or CLI flags.
    pub fn parse(mode: &str) -> Result<Self, crate::error::ConfigError> {
        match mode {
            "mean" => Ok(CentroidMode::Mean),
            "rocchio" => Ok(CentroidMode::Rocchio),
            other => Err(crate::error::ConfigError::ValidationError(format!(
                "unknown classifier mode '{other}' (expected 'mean' or 'rocchio')"
            ))),
        }
    }
}

/// Immutable fitted state: one centroid per class.
///
/// Replaced wholesale on each fit; an inference run holds an `Arc` to one
/// snapshot for its entire duration.
#[derive(Debug, Clone)]
pub struct PrototypeSnapshot {
    positive: Vec<f32>,
    negative: Vec<f32>,
    temperature: f32,
}

impl PrototypeSnapshot {
    /// The positive-class centroid.
    pub fn positive_centroid(&self) -> &[f32] {
        &self.positive
    }

    /// The negative-class centroid.
    pub fn negative_centroid(&self) -> &[f32] {
        &self.negative
    }
}

impl Scorer for PrototypeSnapshot {
    fn score(&self, embedding: &[f32]) -> SessionResult<f32> {
        if embedding.len() != self.positive.len() {
            return Err(SessionError::DimensionMismatch {
                expected: self.positive.len(),
                actual: embedding.len(),
            });
        }

        let margin = cosine_similarity(embedding, &self.positive)
            - cosine_similarity(embedding, &self.negative);
        let logit = margin / self.temperature;
        Ok(1.0 / (1.0 + (-logit).exp()))
    }

    fn dim(&self) -> usize {
        self.positive.len()
    }
}

/// Prototype classifier over positive/negative centroids.
#[derive(Debug)]
pub struct RocchioPrototypeModel {
    mode: CentroidMode,
    params: ClassifierParams,
    snapshot: Option<Arc<PrototypeSnapshot>>,
}

impl RocchioPrototypeModel {
    /// Create an unfitted model.
    pub fn new(mode: CentroidMode, params: ClassifierParams) -> Self {
        Self {
            mode,
            params,
            snapshot: None,
        }
    }

    fn centroid(&self, own_mean: &[f32], opposite_mean: &[f32]) -> Vec<f32> {
        match self.mode {
            CentroidMode::Mean => own_mean.to_vec(),
            CentroidMode::Rocchio => own_mean
                .iter()
                .zip(opposite_mean)
                .map(|(own, opp)| self.params.beta * own - self.params.gamma * opp)
                .collect(),
        }
    }
}

impl Model for RocchioPrototypeModel {
    fn name(&self) -> &str {
        "rocchio-prototype"
    }

    fn params(&self) -> &ClassifierParams {
        &self.params
    }

    fn fit(&mut self, labeled: &BTreeMap<SampleId, LabeledEmbedding>) -> SessionResult<()> {
        let mut positives: Vec<&[f32]> = Vec::new();
        let mut negatives: Vec<&[f32]> = Vec::new();
        for (embedding, label) in labeled.values() {
            match label {
                Label::Positive => positives.push(embedding),
                Label::Negative => negatives.push(embedding),
                Label::Unlabeled => {}
            }
        }

        if positives.is_empty() || negatives.is_empty() {
            return Err(SessionError::InsufficientLabels {
                positives: positives.len(),
                negatives: negatives.len(),
            });
        }

        let dim = positives[0].len();
        for embedding in positives.iter().chain(&negatives) {
            if embedding.len() != dim {
                return Err(SessionError::DimensionMismatch {
                    expected: dim,
                    actual: embedding.len(),
                });
            }
        }

        let positive_mean = mean_vector(&positives);
        let negative_mean = mean_vector(&negatives);

        let snapshot = PrototypeSnapshot {
            positive: self.centroid(&positive_mean, &negative_mean),
            negative: self.centroid(&negative_mean, &positive_mean),
            temperature: self.params.temperature,
        };

        tracing::debug!(
            positives = positives.len(),
            negatives = negatives.len(),
            dim,
            mode = ?self.mode,
            "Fitted prototype classifier"
        );

        self.snapshot = Some(Arc::new(snapshot));
        Ok(())
    }

    fn score(&self, embedding: &[f32]) -> SessionResult<f32> {
        self.fitted()?.score(embedding)
    }

    fn fitted(&self) -> SessionResult<Arc<dyn Scorer>> {
        match &self.snapshot {
            Some(snapshot) => Ok(Arc::clone(snapshot) as Arc<dyn Scorer>),
            None => Err(SessionError::NotFitted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_2d() -> BTreeMap<SampleId, LabeledEmbedding> {
        let mut labeled = BTreeMap::new();
        labeled.insert("s1".to_string(), (vec![1.0, 1.0], Label::Positive));
        labeled.insert("s2".to_string(), (vec![1.0, 0.9], Label::Positive));
        labeled.insert("s3".to_string(), (vec![-1.0, -1.0], Label::Negative));
        labeled
    }

    fn mean_model() -> RocchioPrototypeModel {
        let params = ClassifierParams {
            mode: "mean".to_string(),
            ..Default::default()
        };
        RocchioPrototypeModel::new(CentroidMode::Mean, params)
    }

    #[test]
    fn test_score_before_fit_is_not_fitted() {
        let model = mean_model();
        let err = model.score(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, SessionError::NotFitted));
    }

    #[test]
    fn test_fit_single_class_fails() {
        let mut model = mean_model();
        let mut labeled = BTreeMap::new();
        labeled.insert("s1".to_string(), (vec![1.0, 1.0], Label::Positive));
        labeled.insert("s2".to_string(), (vec![1.0, 0.9], Label::Positive));
        let err = model.fit(&labeled).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InsufficientLabels {
                positives: 2,
                negatives: 0
            }
        ));
    }

    #[test]
    fn test_fit_mean_centroids() {
        let mut model = mean_model();
        model.fit(&labeled_2d()).unwrap();
        let snapshot = model.fitted().unwrap();
        assert_eq!(snapshot.dim(), 2);

        let fitted = model.snapshot.as_ref().unwrap();
        assert!((fitted.positive_centroid()[0] - 1.0).abs() < 1e-6);
        assert!((fitted.positive_centroid()[1] - 0.95).abs() < 1e-6);
        assert_eq!(fitted.negative_centroid(), &[-1.0, -1.0]);
    }

    #[test]
    fn test_score_margins() {
        let mut model = mean_model();
        model.fit(&labeled_2d()).unwrap();

        // Near the positive cluster
        let high = model.score(&[0.9, 0.9]).unwrap();
        assert!(high > 0.8, "expected high positive confidence, got {high}");

        // Near the negative cluster
        let low = model.score(&[-0.9, -0.9]).unwrap();
        assert!(low < 0.2, "expected high negative confidence, got {low}");
    }

    #[test]
    fn test_score_deterministic() {
        let mut model = mean_model();
        model.fit(&labeled_2d()).unwrap();
        let a = model.score(&[0.3, -0.1]).unwrap();
        let b = model.score(&[0.3, -0.1]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_dimension_mismatch() {
        let mut model = mean_model();
        model.fit(&labeled_2d()).unwrap();
        let err = model.score(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_fit_inconsistent_dimensions() {
        let mut model = mean_model();
        let mut labeled = BTreeMap::new();
        labeled.insert("s1".to_string(), (vec![1.0, 1.0], Label::Positive));
        labeled.insert("s2".to_string(), (vec![1.0], Label::Negative));
        let err = model.fit(&labeled).unwrap_err();
        assert!(matches!(err, SessionError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_rocchio_subtracts_opposite_mean() {
        let params = ClassifierParams {
            mode: "rocchio".to_string(),
            beta: 1.0,
            gamma: 0.5,
            temperature: 1.0,
        };
        let mut model = RocchioPrototypeModel::new(CentroidMode::Rocchio, params);
        model.fit(&labeled_2d()).unwrap();

        // positive = 1.0 * (1.0, 0.95) - 0.5 * (-1.0, -1.0) = (1.5, 1.45)
        let fitted = model.snapshot.as_ref().unwrap();
        assert!((fitted.positive_centroid()[0] - 1.5).abs() < 1e-6);
        assert!((fitted.positive_centroid()[1] - 1.45).abs() < 1e-6);
    }

    #[test]
    fn test_refit_replaces_snapshot() {
        let mut model = mean_model();
        model.fit(&labeled_2d()).unwrap();
        let before = model.score(&[0.9, 0.9]).unwrap();

        // Flip s2 to negative; the positive centroid loses it
        let mut relabeled = labeled_2d();
        relabeled.insert("s2".to_string(), (vec![1.0, 0.9], Label::Negative));
        model.fit(&relabeled).unwrap();

        let fitted = model.snapshot.as_ref().unwrap();
        assert_eq!(fitted.positive_centroid(), &[1.0, 1.0]);
        let after = model.score(&[0.9, 0.9]).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_snapshot_outlives_refit() {
        let mut model = mean_model();
        model.fit(&labeled_2d()).unwrap();
        let held = model.fitted().unwrap();
        let before = held.score(&[0.9, 0.9]).unwrap();

        let mut relabeled = labeled_2d();
        relabeled.insert("s2".to_string(), (vec![1.0, 0.9], Label::Negative));
        model.fit(&relabeled).unwrap();

        // The held snapshot still scores against the old centroids
        assert_eq!(held.score(&[0.9, 0.9]).unwrap(), before);
    }

    #[test]
    fn test_temperature_sharpens_scores() {
        let sharp_params = ClassifierParams {
            mode: "mean".to_string(),
            temperature: 0.1,
            ..Default::default()
        };
        let mut sharp = RocchioPrototypeModel::new(CentroidMode::Mean, sharp_params);
        sharp.fit(&labeled_2d()).unwrap();

        let mut soft = mean_model();
        soft.fit(&labeled_2d()).unwrap();

        let e = [0.9, 0.9];
        assert!(sharp.score(&e).unwrap() > soft.score(&e).unwrap());
    }
}
