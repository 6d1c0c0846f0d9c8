#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ml_token_tagger::checkpoint::{unix_timestamp, CheckpointManager};
use ml_token_tagger::config::AppConfig;
use ml_token_tagger::data::{self, TaggingDataset};
use ml_token_tagger::model::{ArchSpec, HeadDims};
use ml_token_tagger::tracking::RunTracker;
use ml_token_tagger::training::{FitOutcome, TrainSession};
use ml_token_tagger::{default_device, DefaultAutodiffBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Arch {
    Transformer,
    Recurrent,
    Both,
}

/// Train sequence taggers on a labeled token corpus.
#[derive(Parser)]
#[command(name = "train", about = "Train token taggers with early stopping")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Architecture(s) to train
    #[arg(long, value_enum, default_value = "both")]
    arch: Arch,

    /// Override number of training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override the data generation / split / shuffle seed
    #[arg(long)]
    seed: Option<u64>,

    /// Tracking run name (defaults to run_{unix_time})
    #[arg(long)]
    run_name: Option<String>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ml_token_tagger=info".parse()?),
        )
        .init();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    if let Some(epochs) = cli.epochs {
        config.training.epochs = epochs;
    }
    if let Some(lr) = cli.lr {
        config.training.learning_rate = lr;
    }
    if let Some(seed) = cli.seed {
        config.data.seed = seed;
        config.training.shuffle_seed = seed;
    }
    config
        .validate()
        .context("validating config after CLI overrides")?;

    let (train_samples, val_samples) =
        data::prepare(&config.data).context("preparing dataset")?;

    let heads = HeadDims::new(
        config.data.ast_classes,
        config.data.symbol_classes,
        config.data.error_classes,
    );

    let run_name = cli
        .run_name
        .clone()
        .unwrap_or_else(|| format!("run_{}", unix_timestamp()));
    let mut tracker = RunTracker::create(&config.tracking.dir, &run_name, &config)
        .context("creating tracking run")?;
    println!("Tracking run at {}", tracker.run_dir().display());

    let manager = CheckpointManager::new(config.checkpoint.clone());
    let device = default_device();

    let mut session = TrainSession::<DefaultAutodiffBackend> {
        config: &config.training,
        heads,
        pad_token: config.data.pad_token,
        padding_label: config.data.padding_label,
        device: device.clone(),
        tracker: &mut tracker,
        checkpoints: &manager,
    };

    let datasets = || {
        (
            TaggingDataset::new(
                train_samples.clone(),
                config.data.max_seq_len,
                config.data.pad_token,
                config.data.padding_label,
            ),
            TaggingDataset::new(
                val_samples.clone(),
                config.data.max_seq_len,
                config.data.pad_token,
                config.data.padding_label,
            ),
        )
    };

    let mut outcomes: Vec<FitOutcome> = Vec::new();

    if matches!(cli.arch, Arch::Transformer | Arch::Both) {
        let model_config = config.transformer.tagger_config(
            config.data.vocab_size,
            config.data.max_seq_len,
            heads,
        );
        let model = model_config.init::<DefaultAutodiffBackend>(&device);
        let (train_ds, val_ds) = datasets();
        let (_model, outcome) = session.fit(
            model,
            "transformer",
            ArchSpec::Transformer(model_config),
            train_ds,
            val_ds,
        )?;
        outcomes.push(outcome);
    }

    if matches!(cli.arch, Arch::Recurrent | Arch::Both) {
        let model_config = config
            .recurrent
            .tagger_config(config.data.vocab_size, heads);
        let model = model_config.init::<DefaultAutodiffBackend>(&device);
        let (train_ds, val_ds) = datasets();
        let (_model, outcome) = session.fit(
            model,
            "recurrent",
            ArchSpec::Recurrent(model_config),
            train_ds,
            val_ds,
        )?;
        outcomes.push(outcome);
    }

    println!();
    for outcome in &outcomes {
        match outcome.best_epoch {
            Some(epoch) => println!(
                "{}: best val loss {:.4} at epoch {}/{}{}",
                outcome.model_name,
                outcome.best_val_loss,
                epoch,
                outcome.epochs_run,
                if outcome.stopped_early {
                    " (stopped early)"
                } else {
                    ""
                },
            ),
            None => println!("{}: no completed epochs", outcome.model_name),
        }
    }

    Ok(())
}
