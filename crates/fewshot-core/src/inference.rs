//! Batched inference over the working collection.
//!
//! Applies a fitted classifier snapshot to every sample without holding all
//! embeddings in memory at once: sample ids are partitioned into fixed-size
//! batches, each batch's embeddings are fetched from the provider and
//! scored, and results are merged into one mapping. Batches may fan out
//! across a bounded worker pool, and a run can be cancelled between batches
//! (partial output is discarded, never published).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::classifier::Scorer;
use crate::error::{SessionError, SessionResult};
use crate::provider::EmbeddingProvider;
use crate::types::{Prediction, SampleId};

/// Tuning knobs for one inference run.
#[derive(Debug, Clone)]
pub struct InferenceOptions {
    /// Number of samples per batch
    pub batch_size: usize,

    /// Concurrent batch workers; 0 means fully sequential
    pub num_workers: usize,

    /// Skip samples whose embedding cannot be retrieved or scored,
    /// instead of aborting the whole run
    pub skip_failures: bool,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            num_workers: 0,
            skip_failures: true,
        }
    }
}

/// Cooperative cancellation flag shared between a run and its owner.
///
/// Checked between batches only; scoring within a batch is short-lived.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an untripped flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the flag; the run aborts at the next between-batch check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been tripped.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Applies a fitted classifier snapshot across a sample collection.
pub struct BatchInferenceEngine {
    options: InferenceOptions,
}

impl BatchInferenceEngine {
    /// Create an engine with the given options.
    pub fn new(options: InferenceOptions) -> Self {
        Self { options }
    }

    /// Score every sample in `sample_ids`.
    ///
    /// Returns the prediction mapping plus the number of samples skipped
    /// under `skip_failures`. Every successfully processed sample appears
    /// exactly once. If `cancel` trips before the run completes, partial
    /// output is discarded and [`SessionError::StaleGeneration`] is
    /// returned.
    pub async fn run(
        &self,
        scorer: Arc<dyn Scorer>,
        provider: Arc<dyn EmbeddingProvider>,
        sample_ids: &[SampleId],
        generation: u64,
        cancel: &CancelFlag,
    ) -> SessionResult<(HashMap<SampleId, Prediction>, usize)> {
        let batches: Vec<Vec<SampleId>> = sample_ids
            .chunks(self.options.batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();

        tracing::debug!(
            samples = sample_ids.len(),
            batches = batches.len(),
            batch_size = self.options.batch_size,
            num_workers = self.options.num_workers,
            "Starting inference run"
        );

        let (predictions, skipped) = if self.options.num_workers == 0 {
            self.run_sequential(scorer, provider, batches, generation, cancel)
                .await?
        } else {
            self.run_parallel(scorer, provider, batches, generation, cancel)
                .await?
        };

        // Final check so a run cancelled during its last batch does not
        // publish results the caller has already decided to discard.
        if cancel.is_cancelled() {
            return Err(SessionError::StaleGeneration { generation });
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Inference run omitted unavailable samples");
        }

        Ok((predictions, skipped))
    }

    async fn run_sequential(
        &self,
        scorer: Arc<dyn Scorer>,
        provider: Arc<dyn EmbeddingProvider>,
        batches: Vec<Vec<SampleId>>,
        generation: u64,
        cancel: &CancelFlag,
    ) -> SessionResult<(HashMap<SampleId, Prediction>, usize)> {
        let mut predictions = HashMap::new();
        let mut skipped = 0;

        for batch in batches {
            if cancel.is_cancelled() {
                return Err(SessionError::StaleGeneration { generation });
            }
            let (batch_predictions, batch_skipped) =
                score_batch(&*scorer, &*provider, &batch, self.options.skip_failures).await?;
            predictions.extend(batch_predictions);
            skipped += batch_skipped;
        }

        Ok((predictions, skipped))
    }

    async fn run_parallel(
        &self,
        scorer: Arc<dyn Scorer>,
        provider: Arc<dyn EmbeddingProvider>,
        batches: Vec<Vec<SampleId>>,
        generation: u64,
        cancel: &CancelFlag,
    ) -> SessionResult<(HashMap<SampleId, Prediction>, usize)> {
        let semaphore = Arc::new(Semaphore::new(self.options.num_workers));
        let mut join_set: JoinSet<SessionResult<(Vec<(SampleId, Prediction)>, usize)>> =
            JoinSet::new();

        for batch in batches {
            if cancel.is_cancelled() {
                join_set.abort_all();
                return Err(SessionError::StaleGeneration { generation });
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| SessionError::StaleGeneration { generation })?;
            let scorer = Arc::clone(&scorer);
            let provider = Arc::clone(&provider);
            let skip_failures = self.options.skip_failures;

            join_set.spawn(async move {
                let _permit = permit;
                let (predictions, skipped) =
                    score_batch(&*scorer, &*provider, &batch, skip_failures).await?;
                Ok((predictions.into_iter().collect(), skipped))
            });
        }

        let mut predictions = HashMap::new();
        let mut skipped = 0;

        while let Some(joined) = join_set.join_next().await {
            let task_result = match joined {
                Ok(result) => result,
                Err(e) => {
                    join_set.abort_all();
                    return Err(SessionError::EmbeddingUnavailable {
                        sample_id: "<batch>".to_string(),
                        message: format!("inference worker failed: {e}"),
                    });
                }
            };
            match task_result {
                Ok((batch_predictions, batch_skipped)) => {
                    predictions.extend(batch_predictions);
                    skipped += batch_skipped;
                }
                Err(e) => {
                    join_set.abort_all();
                    return Err(e);
                }
            }
        }

        Ok((predictions, skipped))
    }
}

/// Fetch and score one batch.
///
/// With `skip_failures`, a sample that cannot be fetched or scored is
/// logged and omitted; otherwise the first failure aborts the batch.
async fn score_batch(
    scorer: &dyn Scorer,
    provider: &dyn EmbeddingProvider,
    batch: &[SampleId],
    skip_failures: bool,
) -> SessionResult<(HashMap<SampleId, Prediction>, usize)> {
    let mut predictions = HashMap::with_capacity(batch.len());
    let mut skipped = 0;

    for (sample_id, fetched) in provider.get_many(batch).await {
        let scored = fetched.and_then(|embedding| scorer.score(&embedding));
        match scored {
            Ok(score) => {
                predictions.insert(sample_id, Prediction::from_score(score));
            }
            Err(e) if skip_failures => {
                tracing::warn!(sample_id = %sample_id, "Skipping sample: {e}");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok((predictions, skipped))
}
