//! Fewshot CLI - iterative few-shot sample mining from the command line.
//!
//! Loads pre-computed embeddings and user labels from JSONL files, trains
//! a prototype classifier, scores the full collection, and exports the
//! sample ids predicted positive.
//!
//! # Usage
//!
//! ```bash
//! # Train on labeled samples and predict over the collection
//! fewshot train --embeddings embeddings.jsonl --labels labels.jsonl \
//!     --output predictions.jsonl
//!
//! # Export sample ids above a confidence threshold
//! fewshot tag --predictions predictions.jsonl --threshold 0.6
//!
//! # View configuration
//! fewshot config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Fewshot - iterative few-shot sample mining: label, train, predict, export.
#[derive(Parser, Debug)]
#[command(name = "fewshot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a classifier on labeled samples and predict over the collection
    Train(cli::train::TrainArgs),

    /// Select sample ids whose prediction meets a confidence threshold
    Tag(cli::tag::TagArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match fewshot_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `fewshot config path`."
            );
            fewshot_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Fewshot v{}", fewshot_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Train(args) => cli::train::execute(args, config).await,
        Commands::Tag(args) => cli::tag::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
