//! User-assigned labels and the authoritative label store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::SampleId;

/// A user-assigned class label.
///
/// Labels are only ever set by explicit user action; nothing in this crate
/// infers them automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Positive,
    Negative,
    Unlabeled,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Positive => write!(f, "positive"),
            Label::Negative => write!(f, "negative"),
            Label::Unlabeled => write!(f, "unlabeled"),
        }
    }
}

/// Authoritative record of user labeling intent.
///
/// The store holds in-memory state only and never triggers training; the
/// session decides when to consume the labeled set. A `BTreeMap` keeps the
/// labeled set ordered so generation fingerprints are deterministic.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    labels: BTreeMap<SampleId, Label>,
}

impl LabelStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label for a sample, overwriting any prior label.
    ///
    /// Idempotent; setting `Unlabeled` removes the sample from the labeled
    /// set entirely.
    pub fn set_label(&mut self, sample_id: impl Into<SampleId>, label: Label) {
        let sample_id = sample_id.into();
        match label {
            Label::Unlabeled => {
                self.labels.remove(&sample_id);
            }
            _ => {
                self.labels.insert(sample_id, label);
            }
        }
    }

    /// The current labeled set, excluding unlabeled samples.
    pub fn labeled_samples(&self) -> &BTreeMap<SampleId, Label> {
        &self.labels
    }

    /// Look up the label for a sample.
    pub fn label_of(&self, sample_id: &str) -> Label {
        self.labels
            .get(sample_id)
            .copied()
            .unwrap_or(Label::Unlabeled)
    }

    /// Count of (positive, negative) labels.
    pub fn counts(&self) -> (usize, usize) {
        let positives = self
            .labels
            .values()
            .filter(|l| **l == Label::Positive)
            .count();
        (positives, self.labels.len() - positives)
    }

    /// Total number of labeled samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no samples are labeled.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Remove all labels.
    pub fn clear(&mut self) {
        self.labels.clear();
    }
}
