//! Training session orchestration.
//!
//! Drives the label → train → predict → review cycle and guarantees the
//! published predictions always correspond to one completed cycle: the
//! prediction set is replaced atomically, tagged with a generation id and a
//! fingerprint of the label set + hyperparameters that produced it, and
//! marked stale (but kept visible) when labels change afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classifier::{create_model, ClassifierParams, LabeledEmbedding, Model};
use crate::error::{ConfigError, SessionError, SessionResult};
use crate::inference::{BatchInferenceEngine, CancelFlag, InferenceOptions};
use crate::labels::{Label, LabelStore};
use crate::provider::EmbeddingProvider;
use crate::types::{Generation, PredictionSet, SampleId};

/// Phase of the iterative mining loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Labeling,
    Training,
    Predicting,
    Reviewing,
    Exporting,
}

impl SessionState {
    /// Whether the transition `self -> to` is legal.
    ///
    /// Training and Predicting revert to Labeling on failure; Reviewing
    /// forks to Labeling (more labels) or Exporting (tag positives).
    fn allows(self, to: SessionState) -> bool {
        use SessionState::*;
        if to == Idle {
            // Reset is always legal
            return true;
        }
        matches!(
            (self, to),
            (Idle, Labeling)
                | (Labeling, Training)
                | (Training, Predicting)
                | (Training, Labeling)
                | (Predicting, Reviewing)
                | (Predicting, Labeling)
                | (Reviewing, Labeling)
                | (Reviewing, Exporting)
                | (Exporting, Reviewing)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Labeling => "labeling",
            SessionState::Training => "training",
            SessionState::Predicting => "predicting",
            SessionState::Reviewing => "reviewing",
            SessionState::Exporting => "exporting",
        };
        write!(f, "{name}")
    }
}

/// Orchestrates labels, classifier, and batch inference for one dataset.
pub struct TrainingSession {
    provider: Arc<dyn EmbeddingProvider>,
    collection: Vec<SampleId>,
    labels: LabelStore,
    model: Box<dyn Model>,
    params: ClassifierParams,
    engine: BatchInferenceEngine,
    state: SessionState,
    predictions: Option<PredictionSet>,
    stale: bool,
    generation_counter: u64,
    active_run: Option<CancelFlag>,
}

impl TrainingSession {
    /// Create a session over the given working collection.
    ///
    /// Fails if the classifier mode is unknown.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        collection: Vec<SampleId>,
        params: ClassifierParams,
        options: InferenceOptions,
    ) -> Result<Self, ConfigError> {
        let model = create_model(&params)?;
        Ok(Self {
            provider,
            collection,
            labels: LabelStore::new(),
            model,
            params,
            engine: BatchInferenceEngine::new(options),
            state: SessionState::Idle,
            predictions: None,
            stale: false,
            generation_counter: 0,
            active_run: None,
        })
    }

    /// Begin labeling (Idle -> Labeling).
    pub fn start(&mut self) -> SessionResult<()> {
        self.transition(SessionState::Labeling)
    }

    /// Record a user label.
    ///
    /// Legal while Labeling or Reviewing; relabeling during review returns
    /// the session to Labeling and marks the current predictions stale
    /// without discarding them.
    pub fn set_label(&mut self, sample_id: impl Into<SampleId>, label: Label) -> SessionResult<()> {
        match self.state {
            SessionState::Labeling => {}
            SessionState::Reviewing => {
                self.transition(SessionState::Labeling)?;
                self.stale = true;
                tracing::debug!("Labels changed during review; predictions marked stale");
            }
            from => {
                return Err(SessionError::IllegalTransition {
                    from: from.to_string(),
                    to: SessionState::Labeling.to_string(),
                })
            }
        }
        self.labels.set_label(sample_id, label);
        Ok(())
    }

    /// Run one full train + predict cycle and publish the results.
    ///
    /// On any failure the session reverts to Labeling and the last-good
    /// prediction set is left untouched. Nothing is retried automatically.
    pub async fn train_and_label(&mut self) -> SessionResult<&PredictionSet> {
        if self.state == SessionState::Reviewing {
            self.transition(SessionState::Labeling)?;
        }
        if self.state != SessionState::Labeling {
            return Err(SessionError::IllegalTransition {
                from: self.state.to_string(),
                to: SessionState::Training.to_string(),
            });
        }

        let (positives, negatives) = self.labels.counts();
        if positives == 0 || negatives == 0 {
            return Err(SessionError::InsufficientLabels {
                positives,
                negatives,
            });
        }

        self.transition(SessionState::Training)?;
        let start = std::time::Instant::now();

        let labeled = match self.fetch_labeled_embeddings().await {
            Ok(labeled) => labeled,
            Err(e) => return Err(self.fail_to_labeling(e)),
        };

        if let Err(e) = self.model.fit(&labeled) {
            return Err(self.fail_to_labeling(e));
        }
        tracing::debug!(elapsed = ?start.elapsed(), "Fit complete");

        let snapshot = match self.model.fitted() {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail_to_labeling(e)),
        };

        if let Err(e) = self.transition(SessionState::Predicting) {
            return Err(self.fail_to_labeling(e));
        }

        // Any in-flight run from an earlier cycle is superseded now.
        if let Some(previous) = self.active_run.take() {
            previous.cancel();
        }
        let cancel = CancelFlag::new();
        self.active_run = Some(cancel.clone());

        self.generation_counter += 1;
        let generation = Generation {
            id: self.generation_counter,
            fingerprint: fingerprint(self.labels.labeled_samples(), &self.params),
        };

        let run = self
            .engine
            .run(
                snapshot,
                Arc::clone(&self.provider),
                &self.collection,
                generation.id,
                &cancel,
            )
            .await;

        let (predictions, skipped) = match run {
            Ok(result) => result,
            Err(e) => return Err(self.fail_to_labeling(e)),
        };

        let set = PredictionSet {
            generation,
            predictions,
            skipped,
        };
        tracing::info!(
            generation = set.generation.id,
            scored = set.len(),
            skipped,
            elapsed = ?start.elapsed(),
            "Train and label cycle complete"
        );

        self.stale = false;
        self.active_run = None;
        self.transition(SessionState::Reviewing)?;

        // Publish atomically: the previous set is only replaced here, after
        // the new cycle has fully completed.
        Ok(self.predictions.insert(set))
    }

    /// Sample ids whose latest prediction meets `threshold`.
    ///
    /// Pure read over the last completed generation; ids are returned in
    /// sorted order for stable export.
    pub fn tag_positives(&mut self, threshold: f32) -> SessionResult<Vec<SampleId>> {
        self.transition(SessionState::Exporting)?;
        let result = match &self.predictions {
            Some(set) => {
                let mut ids: Vec<SampleId> = set
                    .predictions
                    .iter()
                    .filter(|(_, p)| p.score >= threshold)
                    .map(|(id, _)| id.clone())
                    .collect();
                ids.sort();
                Ok(ids)
            }
            None => Err(SessionError::NotFitted),
        };
        self.transition(SessionState::Reviewing)?;
        result
    }

    /// Discard labels, fitted state, and predictions; back to Idle.
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        if let Some(run) = self.active_run.take() {
            run.cancel();
        }
        self.model = create_model(&self.params)?;
        self.labels.clear();
        self.predictions = None;
        self.stale = false;
        self.generation_counter = 0;
        self.state = SessionState::Idle;
        tracing::debug!("Session reset");
        Ok(())
    }

    /// Current state machine phase.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The last completed prediction set, if any.
    pub fn predictions(&self) -> Option<&PredictionSet> {
        self.predictions.as_ref()
    }

    /// Whether labels changed since the last completed cycle.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// The label store (read-only; mutate via [`TrainingSession::set_label`]).
    pub fn labels(&self) -> &LabelStore {
        &self.labels
    }

    /// The working collection of sample ids.
    pub fn collection(&self) -> &[SampleId] {
        &self.collection
    }

    fn transition(&mut self, to: SessionState) -> SessionResult<()> {
        if !self.state.allows(to) {
            return Err(SessionError::IllegalTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        tracing::trace!(from = %self.state, to = %to, "Session transition");
        self.state = to;
        Ok(())
    }

    fn fail_to_labeling(&mut self, e: SessionError) -> SessionError {
        tracing::warn!("Cycle failed, returning to labeling: {e}");
        self.state = SessionState::Labeling;
        e
    }

    async fn fetch_labeled_embeddings(
        &self,
    ) -> SessionResult<BTreeMap<SampleId, LabeledEmbedding>> {
        let mut labeled = BTreeMap::new();
        for (sample_id, label) in self.labels.labeled_samples() {
            let embedding = self.provider.get(sample_id).await?;
            labeled.insert(sample_id.clone(), (embedding, *label));
        }
        Ok(labeled)
    }
}

/// BLAKE3 fingerprint of the labeled set and hyperparameters.
///
/// Identical label sets and parameters always produce the same digest, so
/// a published generation can be matched against the state that made it.
fn fingerprint(labeled: &BTreeMap<SampleId, Label>, params: &ClassifierParams) -> String {
    let mut hasher = blake3::Hasher::new();
    for (sample_id, label) in labeled {
        hasher.update(sample_id.as_bytes());
        hasher.update(b"=");
        hasher.update(label.to_string().as_bytes());
        hasher.update(b"\n");
    }
    if let Ok(params_json) = serde_json::to_vec(params) {
        hasher.update(&params_json);
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryEmbeddingProvider;

    fn demo_session() -> TrainingSession {
        let mut provider = MemoryEmbeddingProvider::new();
        provider.insert("s1", vec![1.0, 1.0]);
        provider.insert("s2", vec![1.0, 0.9]);
        provider.insert("s3", vec![-1.0, -1.0]);
        provider.insert("s4", vec![0.9, 0.9]);
        provider.insert("s5", vec![-0.9, -0.9]);
        let collection = provider.sample_ids();

        let params = ClassifierParams {
            mode: "mean".to_string(),
            ..Default::default()
        };
        TrainingSession::new(
            Arc::new(provider),
            collection,
            params,
            InferenceOptions {
                batch_size: 2,
                num_workers: 0,
                skip_failures: true,
            },
        )
        .unwrap()
    }

    fn label_demo(session: &mut TrainingSession) {
        session.set_label("s1", Label::Positive).unwrap();
        session.set_label("s2", Label::Positive).unwrap();
        session.set_label("s3", Label::Negative).unwrap();
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let mut session = demo_session();
        session.start().unwrap();
        label_demo(&mut session);

        let set = session.train_and_label().await.unwrap();
        assert_eq!(set.generation.id, 1);
        assert_eq!(set.len(), 5);
        assert_eq!(set.skipped, 0);

        // Unlabeled neighbors land on the right side of the boundary
        assert_eq!(
            set.predictions["s4"].decision,
            Label::Positive,
            "s4 should classify positive"
        );
        assert_eq!(set.predictions["s5"].decision, Label::Negative);
        assert!(set.predictions["s4"].score > 0.8);
        assert!(set.predictions["s5"].score < 0.2);

        assert_eq!(session.state(), SessionState::Reviewing);
        assert!(!session.is_stale());
    }

    #[tokio::test]
    async fn test_insufficient_labels() {
        let mut session = demo_session();
        session.start().unwrap();
        session.set_label("s1", Label::Positive).unwrap();

        let err = session.train_and_label().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InsufficientLabels {
                positives: 1,
                negatives: 0
            }
        ));
        assert_eq!(session.state(), SessionState::Labeling);
    }

    #[tokio::test]
    async fn test_label_in_idle_rejected() {
        let mut session = demo_session();
        let err = session.set_label("s1", Label::Positive).unwrap_err();
        assert!(matches!(err, SessionError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_relabel_marks_stale_but_keeps_last_good() {
        let mut session = demo_session();
        session.start().unwrap();
        label_demo(&mut session);
        session.train_and_label().await.unwrap();
        let first_fingerprint = session.predictions().unwrap().generation.fingerprint.clone();

        // Relabel s2 during review
        session.set_label("s2", Label::Negative).unwrap();
        assert_eq!(session.state(), SessionState::Labeling);
        assert!(session.is_stale());
        // Last-good generation still visible
        assert_eq!(session.predictions().unwrap().generation.id, 1);

        let set = session.train_and_label().await.unwrap();
        assert_eq!(set.generation.id, 2);
        assert_ne!(set.generation.fingerprint, first_fingerprint);
        assert!(!session.is_stale());
    }

    #[tokio::test]
    async fn test_fingerprint_depends_on_labels_only_when_changed() {
        let mut session = demo_session();
        session.start().unwrap();
        label_demo(&mut session);
        session.train_and_label().await.unwrap();
        let first = session.predictions().unwrap().generation.fingerprint.clone();

        // Same labels, same params: retrain reproduces the fingerprint
        let set = session.train_and_label().await.unwrap();
        assert_eq!(set.generation.fingerprint, first);
        assert_eq!(set.generation.id, 2);
    }

    #[tokio::test]
    async fn test_tag_positives() {
        let mut session = demo_session();
        session.start().unwrap();
        label_demo(&mut session);
        session.train_and_label().await.unwrap();

        let positives = session.tag_positives(0.5).unwrap();
        assert_eq!(positives, vec!["s1", "s2", "s4"]);
        assert_eq!(session.state(), SessionState::Reviewing);
    }

    #[tokio::test]
    async fn test_tag_positives_before_training() {
        let mut session = demo_session();
        session.start().unwrap();
        // Labeling -> Exporting is not in the transition table
        let err = session.tag_positives(0.5).unwrap_err();
        assert!(matches!(err, SessionError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_failed_embedding_fetch_reverts_to_labeling() {
        let mut session = demo_session();
        session.start().unwrap();
        label_demo(&mut session);
        session.set_label("ghost", Label::Positive).unwrap();

        let err = session.train_and_label().await.unwrap_err();
        assert!(matches!(err, SessionError::EmbeddingUnavailable { .. }));
        assert_eq!(session.state(), SessionState::Labeling);
        assert!(session.predictions().is_none());
    }

    #[tokio::test]
    async fn test_reset() {
        let mut session = demo_session();
        session.start().unwrap();
        label_demo(&mut session);
        session.train_and_label().await.unwrap();

        session.reset().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.labels().is_empty());
        assert!(session.predictions().is_none());
    }

    #[test]
    fn test_transition_table() {
        use SessionState::*;
        assert!(Idle.allows(Labeling));
        assert!(Labeling.allows(Training));
        assert!(Training.allows(Predicting));
        assert!(Training.allows(Labeling));
        assert!(Predicting.allows(Reviewing));
        assert!(Reviewing.allows(Exporting));
        assert!(Exporting.allows(Reviewing));

        // Exporting while training is statically forbidden
        assert!(!Training.allows(Exporting));
        assert!(!Predicting.allows(Exporting));
        assert!(!Idle.allows(Training));
        assert!(!Labeling.allows(Reviewing));
    }
}
