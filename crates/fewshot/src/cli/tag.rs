//! The `fewshot tag` command: select positives from a predictions file.
//!
//! Mirrors the session's tag-positives selection over an exported
//! predictions JSONL. When the file contains records from more than one
//! generation, only the newest generation is considered.

use std::io::Write;
use std::path::Path;

use clap::Args;

use fewshot_core::PredictionRecord;

use super::expand_path;

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// JSONL file of prediction records produced by `fewshot train`
    #[arg(long)]
    pub predictions: String,

    /// Minimum confidence for a sample to be selected
    #[arg(long, default_value_t = 0.5)]
    pub threshold: f32,

    /// Output file for selected sample ids (one per line); stdout if omitted
    #[arg(long, short)]
    pub output: Option<String>,
}

/// Execute the tag command.
pub async fn execute(args: TagArgs) -> anyhow::Result<()> {
    let records = load_predictions(&expand_path(&args.predictions))?;
    let selected = select_positives(&records, args.threshold);

    tracing::info!(
        selected = selected.len(),
        total = records.len(),
        threshold = args.threshold,
        "Tagged positives"
    );

    match args.output.as_deref().map(expand_path) {
        Some(path) => {
            let mut file = std::fs::File::create(&path)?;
            for id in &selected {
                writeln!(file, "{id}")?;
            }
            tracing::info!("Selected ids written to {path:?}");
        }
        None => {
            for id in &selected {
                println!("{id}");
            }
        }
    }

    Ok(())
}

/// Load a JSONL predictions file.
fn load_predictions(path: &Path) -> anyhow::Result<Vec<PredictionRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read predictions file {path:?}: {e}"))?;

    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: PredictionRecord = serde_json::from_str(line).map_err(|e| {
            anyhow::anyhow!("Bad prediction record at {path:?}:{}: {e}", line_no + 1)
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Select sample ids at or above the threshold, from the newest generation.
fn select_positives(records: &[PredictionRecord], threshold: f32) -> Vec<String> {
    let Some(latest) = records.iter().map(|r| r.generation).max() else {
        return Vec::new();
    };

    let mixed = records.iter().any(|r| r.generation != latest);
    if mixed {
        tracing::warn!(
            generation = latest,
            "Predictions file mixes generations; using only the newest"
        );
    }

    let mut selected: Vec<String> = records
        .iter()
        .filter(|r| r.generation == latest && r.score >= threshold)
        .map(|r| r.sample_id.clone())
        .collect();
    selected.sort();
    selected.dedup();
    selected
}
