#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::data::dataloader::DataLoaderBuilder;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ml_token_tagger::checkpoint::{load_weights, CheckpointManager, CheckpointMetadata};
use ml_token_tagger::config::AppConfig;
use ml_token_tagger::data::{self, TaggingBatcher, TaggingDataset};
use ml_token_tagger::model::ArchSpec;
use ml_token_tagger::training::{evaluate, SplitMetrics};
use ml_token_tagger::{default_device, DefaultBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Arch {
    Transformer,
    Recurrent,
}

impl Arch {
    fn name(self) -> &'static str {
        match self {
            Arch::Transformer => "transformer",
            Arch::Recurrent => "recurrent",
        }
    }
}

/// Score a checkpointed tagger against the validation split.
#[derive(Parser)]
#[command(name = "evaluate", about = "Evaluate a checkpointed token tagger")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Checkpoint directory to evaluate; defaults to the latest checkpoint
    /// of --arch
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Architecture whose latest checkpoint to evaluate
    #[arg(long, value_enum, default_value = "transformer")]
    arch: Arch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ml_token_tagger=info".parse()?),
        )
        .init();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let checkpoint_dir = match &cli.checkpoint {
        Some(dir) => dir.clone(),
        None => {
            let manager = CheckpointManager::new(config.checkpoint.clone());
            manager
                .latest(cli.arch.name())
                .context("resolving latest checkpoint")?
        }
    };
    let metadata = CheckpointMetadata::load(&checkpoint_dir.join("metadata.json"))?;
    println!(
        "Evaluating {} checkpoint from epoch {} ({})",
        metadata.model,
        metadata.epoch,
        checkpoint_dir.display()
    );

    // Rebuild the validation split the training run scored against.
    let (_train_samples, val_samples) =
        data::prepare(&config.data).context("preparing dataset")?;
    let val_ds = TaggingDataset::new(
        val_samples,
        config.data.max_seq_len,
        config.data.pad_token,
        config.data.padding_label,
    );

    let device = default_device();
    let batcher = TaggingBatcher::<DefaultBackend>::new(device.clone(), config.data.pad_token);
    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(config.training.batch_size)
        .num_workers(1)
        .build(val_ds);

    let metrics = match &metadata.arch {
        ArchSpec::Transformer(model_config) => {
            let model = model_config.init::<DefaultBackend>(&device);
            let model = load_weights(&checkpoint_dir, model, &device)?;
            evaluate(
                &model,
                loader.as_ref(),
                model_config.heads,
                config.data.padding_label,
            )
        }
        ArchSpec::Recurrent(model_config) => {
            let model = model_config.init::<DefaultBackend>(&device);
            let model = load_weights(&checkpoint_dir, model, &device)?;
            evaluate(
                &model,
                loader.as_ref(),
                model_config.heads,
                config.data.padding_label,
            )
        }
    };

    print_metrics(&metrics);
    Ok(())
}

fn print_metrics(metrics: &SplitMetrics) {
    println!("Val Loss: {:.4}", metrics.loss);
    println!("Val AST Acc: {:.4}", metrics.ast_accuracy);
    println!("Val Symbol Acc: {:.4}", metrics.symbol_accuracy);
    println!("Val Error Acc: {:.4}", metrics.error_accuracy);
}
