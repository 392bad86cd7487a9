//! Core data types for the few-shot mining loop.
//!
//! These types represent the output of a completed train+predict cycle and
//! the JSONL records the CLI reads and writes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::labels::Label;

/// Identifier for a sample in the working collection.
///
/// Opaque to this crate; typically the host's dataset sample id.
pub type SampleId = String;

/// Fixed-length embedding vector for one sample.
///
/// Produced by an [`EmbeddingProvider`](crate::provider::EmbeddingProvider)
/// and immutable once computed. All embeddings in one session share a
/// dimensionality.
pub type Embedding = Vec<f32>;

/// Confidence and decision for a single sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    /// Confidence in (0, 1); 0.5 is the decision boundary
    pub score: f32,

    /// Positive or Negative (never Unlabeled)
    pub decision: Label,
}

impl Prediction {
    /// Build a prediction from a raw confidence score.
    pub fn from_score(score: f32) -> Self {
        let decision = if score >= 0.5 {
            Label::Positive
        } else {
            Label::Negative
        };
        Self { score, decision }
    }
}

/// Identity of one completed train+predict cycle.
///
/// The fingerprint is a BLAKE3 hash over the labeled set and the
/// hyperparameters used to fit, so a result set can be matched against the
/// label state that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    /// Monotonically increasing cycle counter within a session
    pub id: u64,

    /// BLAKE3 hex digest of the labeled set + hyperparameters
    pub fingerprint: String,
}

/// The published output of one completed train+predict cycle.
///
/// Replaced atomically by the session; never mutated in place.
#[derive(Debug, Clone)]
pub struct PredictionSet {
    /// The cycle that produced these predictions
    pub generation: Generation,

    /// One prediction per successfully scored sample
    pub predictions: HashMap<SampleId, Prediction>,

    /// Samples omitted by skip-on-failure during inference
    pub skipped: usize,
}

impl PredictionSet {
    /// Number of scored samples.
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    /// Whether the set contains no predictions.
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// One embedding record in a JSONL embeddings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub sample_id: SampleId,
    pub embedding: Embedding,
}

/// One label record in a JSONL labels file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRecord {
    pub sample_id: SampleId,
    pub label: Label,
}

/// One prediction record in a JSONL predictions file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub sample_id: SampleId,
    pub score: f32,
    pub decision: Label,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl PredictionRecord {
    /// Build a record from a sample id and its prediction within a set.
    pub fn new(sample_id: SampleId, prediction: &Prediction, generation: &Generation) -> Self {
        Self {
            sample_id,
            score: prediction.score,
            decision: prediction.decision,
            generation: generation.id,
            fingerprint: Some(generation.fingerprint.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_from_score_decision_boundary() {
        assert_eq!(Prediction::from_score(0.9).decision, Label::Positive);
        assert_eq!(Prediction::from_score(0.5).decision, Label::Positive);
        assert_eq!(Prediction::from_score(0.49).decision, Label::Negative);
    }

    #[test]
    fn test_prediction_record_roundtrip() {
        let generation = Generation {
            id: 3,
            fingerprint: "abc123".to_string(),
        };
        let record = PredictionRecord::new(
            "sample_1".to_string(),
            &Prediction::from_score(0.8),
            &generation,
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"decision\":\"positive\""));
        assert!(json.contains("\"generation\":3"));

        let parsed: PredictionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sample_id, "sample_1");
        assert_eq!(parsed.fingerprint.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_prediction_record_skips_none_fingerprint() {
        let record = PredictionRecord {
            sample_id: "s".to_string(),
            score: 0.2,
            decision: Label::Negative,
            generation: 1,
            fingerprint: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("fingerprint"));
    }
}
