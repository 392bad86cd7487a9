//! The `fewshot train` command: load embeddings and labels, run one
//! train+predict cycle, and write prediction records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Args;

use fewshot_core::{
    Config, EmbeddingRecord, Label, LabelRecord, MemoryEmbeddingProvider, PredictionRecord,
    PredictionSet, TrainingSession,
};

use super::expand_path;

/// Arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSONL file of embedding records ({"sample_id", "embedding"})
    #[arg(long)]
    pub embeddings: String,

    /// JSONL file of label records ({"sample_id", "label"})
    #[arg(long)]
    pub labels: String,

    /// Output file for prediction records (JSONL); stdout if omitted
    #[arg(long, short)]
    pub output: Option<String>,

    /// Centroid-computation variant ("mean" or "rocchio")
    #[arg(long)]
    pub mode: Option<String>,

    /// Rocchio weight on the target class mean
    #[arg(long)]
    pub beta: Option<f32>,

    /// Rocchio weight on the subtracted opposite-class mean
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Score sharpness; smaller values saturate confidences faster
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Samples per inference batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Concurrent batch workers; 0 means fully sequential
    #[arg(long)]
    pub num_workers: Option<usize>,

    /// Abort the run on the first unavailable embedding instead of skipping
    #[arg(long)]
    pub no_skip_failures: bool,
}

/// Execute the train command.
pub async fn execute(args: TrainArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&args, &mut config);

    let provider = load_embeddings(&expand_path(&args.embeddings))?;
    let labels = load_labels(&expand_path(&args.labels))?;
    tracing::info!(
        samples = provider.len(),
        labels = labels.len(),
        "Loaded embeddings and labels"
    );

    let collection = provider.sample_ids();
    let mut session = TrainingSession::new(
        Arc::new(provider),
        collection,
        config.classifier.to_params(),
        config.inference.to_options(),
    )?;

    session.start()?;
    for record in &labels {
        session.set_label(record.sample_id.clone(), record.label)?;
    }

    let spinner = create_spinner();
    let start = std::time::Instant::now();
    let result = session.train_and_label().await;
    spinner.finish_and_clear();
    let set = result?;

    write_predictions(set, args.output.as_deref().map(expand_path).as_deref())?;

    let positives = set
        .predictions
        .values()
        .filter(|p| p.decision == Label::Positive)
        .count();
    print_summary(set, positives, start.elapsed());

    Ok(())
}

/// Fold CLI flag overrides into the loaded config.
fn apply_overrides(args: &TrainArgs, config: &mut Config) {
    if let Some(mode) = &args.mode {
        config.classifier.mode = mode.clone();
    }
    if let Some(beta) = args.beta {
        config.classifier.beta = beta;
    }
    if let Some(gamma) = args.gamma {
        config.classifier.gamma = gamma;
    }
    if let Some(temperature) = args.temperature {
        config.classifier.temperature = temperature;
    }
    if let Some(batch_size) = args.batch_size {
        config.inference.batch_size = batch_size;
    }
    if let Some(num_workers) = args.num_workers {
        config.inference.num_workers = num_workers;
    }
    if args.no_skip_failures {
        config.inference.skip_failures = false;
    }
}

/// Load a JSONL embeddings file into an in-memory provider.
fn load_embeddings(path: &Path) -> anyhow::Result<MemoryEmbeddingProvider> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read embeddings file {path:?}: {e}"))?;

    let mut provider = MemoryEmbeddingProvider::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: EmbeddingRecord = serde_json::from_str(line).map_err(|e| {
            anyhow::anyhow!("Bad embedding record at {path:?}:{}: {e}", line_no + 1)
        })?;
        provider.insert(record.sample_id, record.embedding);
    }

    if provider.is_empty() {
        anyhow::bail!("No embedding records found in {path:?}");
    }
    Ok(provider)
}

/// Load a JSONL labels file.
fn load_labels(path: &Path) -> anyhow::Result<Vec<LabelRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read labels file {path:?}: {e}"))?;

    let mut labels = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: LabelRecord = serde_json::from_str(line)
            .map_err(|e| anyhow::anyhow!("Bad label record at {path:?}:{}: {e}", line_no + 1))?;
        labels.push(record);
    }
    Ok(labels)
}

/// Write prediction records as JSONL to a file, or stdout if no path.
fn write_predictions(set: &PredictionSet, output: Option<&Path>) -> anyhow::Result<()> {
    let mut records: Vec<PredictionRecord> = set
        .predictions
        .iter()
        .map(|(id, prediction)| PredictionRecord::new(id.clone(), prediction, &set.generation))
        .collect();
    records.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));

    match output {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            for record in &records {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            writer.flush()?;
            tracing::info!("Predictions written to {path:?}");
        }
        None => {
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
    }
    Ok(())
}

/// Create a spinner for the train+predict cycle.
fn create_spinner() -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("training and predicting...");
    pb
}

/// Print a formatted summary table after a train+predict cycle.
fn print_summary(set: &PredictionSet, positives: usize, elapsed: std::time::Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        set.len() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Generation:   {:>8}", set.generation.id);
    eprintln!("    Scored:       {:>8}", set.len());
    if set.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", set.skipped);
    }
    eprintln!("    Positives:    {:>8}", positives);
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} samples/sec", rate);
    eprintln!("  ====================================");
}
