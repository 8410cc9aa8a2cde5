// NoteStop - study-note dataset preparation, fine-tuning and generation
// Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use notestop::config::{load_config, Config};
use notestop::dataset::{self, io, DatasetError};
use notestop::errors::{self, UserFriendlyError};
use notestop::export;
use notestop::generation::{require_topic, run_task, ModelContext, SubprocessGenerator, Task};
use notestop::training::{SubprocessTrainer, TrainingService};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "notestop")]
#[command(about = "Study-note dataset preparation, fine-tuning and generation", version)]
struct Args {
    /// Config file (default: ~/.notestop/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize raw topic records into instruction/output pairs
    Format {
        /// Raw topic record collection (JSON array)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Formatted pair collection, overwritten
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Clean formatted pairs and wrap them in the training prompt template
    Prepare {
        /// Formatted pair collection (JSON array)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Prepared training file (JSONL), overwritten
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fine-tune the base model on the prepared dataset
    Train {
        /// Prepared training file (JSONL)
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Directory for the final model
        #[arg(long)]
        model_dir: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        learning_rate: Option<f64>,
        /// LoRA rank
        #[arg(long)]
        rank: Option<usize>,
        /// Only check that the Python training stack is importable
        #[arg(long)]
        check: bool,
    },
    /// Generate study material for a topic
    Generate {
        /// Topic, e.g. "Neural Networks"
        #[arg(long)]
        topic: String,
        /// summary, notes, qna or cheatsheet
        #[arg(long)]
        task: Task,
        /// Fine-tuned model directory
        #[arg(long)]
        model: Option<PathBuf>,
        /// Also export the result (.md for Markdown, anything else plain text)
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Format { input, output } => {
            let input = input.unwrap_or_else(|| config.dataset.raw_path.clone());
            let output = output.unwrap_or_else(|| config.dataset.formatted_path.clone());
            run_format(&input, &output)
        }
        Command::Prepare { input, output } => {
            let input = input.unwrap_or_else(|| config.dataset.formatted_path.clone());
            let output = output.unwrap_or_else(|| config.dataset.prepared_path.clone());
            run_prepare(&input, &output)
        }
        Command::Train {
            dataset,
            model_dir,
            batch_size,
            epochs,
            learning_rate,
            rank,
            check,
        } => {
            let mut config = config;
            if let Some(dir) = model_dir {
                config.finetune.trainer.final_model_dir = dir;
            }
            if let Some(batch_size) = batch_size {
                config.finetune.trainer.batch_size = batch_size;
            }
            if let Some(epochs) = epochs {
                config.finetune.trainer.epochs = epochs;
            }
            if let Some(lr) = learning_rate {
                config.finetune.trainer.learning_rate = lr;
            }
            if let Some(rank) = rank {
                config.finetune.lora.rank = rank;
            }
            let dataset = dataset.unwrap_or_else(|| config.dataset.prepared_path.clone());
            run_train(&config, &dataset, check).await
        }
        Command::Generate {
            topic,
            task,
            model,
            export,
        } => {
            let model = model.unwrap_or_else(|| config.generation.model_path.clone());
            run_generate(&config, &model, task, &topic, export.as_deref()).await
        }
    }
}

/// Initialize tracing
///
/// Default: INFO level, overridable with RUST_LOG. NOTESTOP_DEBUG=1 forces debug.
/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    let show_debug = std::env::var("NOTESTOP_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    let env_filter = if show_debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    // Bridge log crate → tracing (for dependencies using log crate)
    tracing_log::LogTracer::init().ok();
}

/// Turn dataset errors into actionable messages
fn dataset_error(err: DatasetError) -> anyhow::Error {
    if let DatasetError::NotFound { path } = &err {
        return anyhow::anyhow!(errors::dataset_not_found_error(&path.display().to_string()));
    }
    if let DatasetError::Parse { path, .. } = &err {
        let message = errors::dataset_parse_error(&path.display().to_string(), &err.to_string());
        return anyhow::Error::new(err).context(message);
    }
    anyhow::Error::new(err)
}

/// Normalize raw records into pairs
fn run_format(input: &Path, output: &Path) -> Result<()> {
    tracing::info!("Loading dataset from {}", input.display());
    let records = io::read_records(input).map_err(dataset_error)?;

    let normalized = dataset::normalize(&records);
    let report = normalized.report;

    tracing::info!(
        records = report.records_in,
        pairs = report.pairs_out,
        "Normalized dataset"
    );
    if report.dropped_records > 0 {
        tracing::warn!(
            dropped = report.dropped_records,
            "Records without qna/summary/notes/cheatsheet were skipped"
        );
    }
    if report.coerced_values > 0 {
        tracing::warn!(
            coerced = report.coerced_values,
            "Field values that were neither text nor a list of text were stored as JSON text"
        );
    }

    io::write_pairs(output, &normalized.pairs).map_err(dataset_error)?;

    println!(
        "✓ Formatted dataset saved to {} ({} pairs)",
        output.display(),
        normalized.pairs.len()
    );
    Ok(())
}

/// Clean pairs and write the prompt-wrapped training file
fn run_prepare(input: &Path, output: &Path) -> Result<()> {
    tracing::info!("Loading formatted dataset from {}", input.display());
    let raw = io::read_raw_pairs(input).map_err(dataset_error)?;

    let cleaned = dataset::clean_pairs(&raw);
    tracing::info!(
        examples = cleaned.pairs.len(),
        discarded = cleaned.discarded,
        "Cleaned dataset"
    );

    let texts = dataset::to_training_texts(&cleaned.pairs);
    io::write_training_texts(output, &texts).map_err(dataset_error)?;

    println!(
        "✓ Cleaned dataset size: {} examples, written to {}",
        texts.len(),
        output.display()
    );
    Ok(())
}

async fn run_train(config: &Config, dataset: &Path, check_only: bool) -> Result<()> {
    let trainer = SubprocessTrainer::new(&config.training.python, &config.training.train_script);

    if check_only {
        let ok = trainer.check_dependencies().await?;
        if ok {
            println!("✓ Python training stack is available");
            return Ok(());
        }
        anyhow::bail!(errors::wrap_error_with_suggestion(
            "Python training stack is incomplete",
            "pip install torch transformers peft trl bitsandbytes"
        ));
    }

    // Fail early on an unreadable dataset rather than inside the trainer
    let examples = io::read_training_texts(dataset).map_err(dataset_error)?;
    if examples.is_empty() {
        anyhow::bail!("Training dataset {} has no examples", dataset.display());
    }
    tracing::info!(examples = examples.len(), "Loaded prepared dataset");

    let run = trainer
        .train(dataset, &config.finetune)
        .await
        .user_context("Fine-tuning did not complete")?;

    println!("✓ Model trained and saved to {}", run.model_dir.display());
    Ok(())
}

async fn run_generate(
    config: &Config,
    model: &Path,
    task: Task,
    topic: &str,
    export_path: Option<&Path>,
) -> Result<()> {
    // A blank topic is reported before the model is looked up
    let topic = require_topic(topic)?;
    let context = ModelContext::open(model)?;
    let generator = SubprocessGenerator::new(
        context,
        &config.training.python,
        &config.training.generate_script,
    );

    let result = run_task(&generator, task, topic).await?;
    println!("{}", result);

    if let Some(path) = export_path {
        export::export(path, task, topic, &result)
            .user_context_with_suggestion("Export failed", "Choose a writable path")
            .with_context(|| format!("Could not export to {}", path.display()))?;
        eprintln!("✓ Exported to {}", path.display());
    }

    Ok(())
}
