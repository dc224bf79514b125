//! Offline trainer: fits the model artifact from a labeled CSV.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use loanshield::logic::train::{self, TrainConfig};

#[derive(Parser, Debug)]
#[command(about = "Fit the loan approval model artifact from a labeled CSV")]
struct Args {
    /// Labeled training data with a loan_status column.
    #[arg(long)]
    csv: PathBuf,

    /// Where to write the fitted artifact.
    #[arg(long, default_value = "model.json")]
    output: PathBuf,

    #[arg(long, default_value_t = 200)]
    trees: usize,

    #[arg(long, default_value_t = 12)]
    max_depth: usize,

    /// Minimum samples on each side of a split.
    #[arg(long, default_value_t = 2)]
    min_leaf: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Fraction of rows held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = TrainConfig {
        trees: args.trees,
        max_depth: args.max_depth,
        min_leaf: args.min_leaf,
        seed: args.seed,
        test_fraction: args.test_fraction,
    };

    let dataset = train::load_csv(&args.csv)
        .with_context(|| format!("loading training data from {}", args.csv.display()))?;
    tracing::info!("Loaded {} labeled rows from {}", dataset.len(), args.csv.display());

    let (artifact, report) = train::train_artifact(&dataset, &config)?;
    tracing::info!(
        "Holdout evaluation: accuracy {:.4} over {} rows (tp {}, tn {}, fp {}, fn {})",
        report.accuracy,
        report.test_rows,
        report.true_positives,
        report.true_negatives,
        report.false_positives,
        report.false_negatives
    );

    artifact
        .save(&args.output)
        .with_context(|| format!("writing artifact to {}", args.output.display()))?;
    tracing::info!(
        "Artifact written to {}: {} trees, {} columns, layout hash {:08x}",
        args.output.display(),
        artifact.forest.trees.len(),
        artifact.transformed_columns.len(),
        artifact.layout_hash
    );
    Ok(())
}
