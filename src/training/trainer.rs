use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::checkpoint::{unix_timestamp, CheckpointManager, CheckpointMetadata, CheckpointMetrics};
use crate::data::{TaggingBatcher, TaggingDataset, TokenBatch};
use crate::error::TrainingError;
use crate::model::{ArchSpec, HeadDims, SequenceTagger};
use crate::tracking::RunTracker;
use crate::training::early_stopping::EarlyStopping;
use crate::training::loss::joint_masked_loss;
use crate::training::metrics::{EpochAccumulator, EpochReport, SplitMetrics};

/// Training hyperparameters (`[training]` section of the config file).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub patience: usize,
    pub min_delta: f64,
    pub shuffle_seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            epochs: 40,
            batch_size: 32,
            learning_rate: 1e-3,
            patience: 5,
            min_delta: 1e-3,
            shuffle_seed: 42,
        }
    }
}

/// Summary of one `fit` call.
#[derive(Debug)]
pub struct FitOutcome {
    pub model_name: String,
    pub epochs_run: usize,
    pub stopped_early: bool,
    /// 1-based epoch of the best validation loss.
    pub best_epoch: Option<usize>,
    pub best_val_loss: f64,
    pub history: Vec<EpochReport>,
}

/// One training session: holds the pieces shared between model fits so the
/// same tracker run and checkpoint store can serve several architectures.
pub struct TrainSession<'a, B: AutodiffBackend> {
    pub config: &'a TrainerConfig,
    pub heads: HeadDims,
    pub pad_token: u32,
    pub padding_label: i32,
    pub device: B::Device,
    pub tracker: &'a mut RunTracker,
    pub checkpoints: &'a CheckpointManager,
}

impl<B: AutodiffBackend> TrainSession<'_, B> {
    /// Fit one model: per epoch a gradient pass over the train split and a
    /// scoring pass over the validation split, with early stopping on the
    /// validation loss. Returns the model rolled back to its best validation
    /// epoch together with the run summary.
    pub fn fit<M>(
        &mut self,
        mut model: M,
        name: &str,
        arch: ArchSpec,
        train: TaggingDataset,
        val: TaggingDataset,
    ) -> Result<(M, FitOutcome), TrainingError>
    where
        M: AutodiffModule<B> + SequenceTagger<B>,
        M::InnerModule: SequenceTagger<B::InnerBackend>,
    {
        if train.is_empty() {
            return Err(TrainingError::EmptyDataset { split: "train" });
        }
        if val.is_empty() {
            return Err(TrainingError::EmptyDataset { split: "val" });
        }
        let train_len = train.len();
        let val_len = val.len();

        let train_batcher = TaggingBatcher::<B>::new(self.device.clone(), self.pad_token);
        let train_loader = DataLoaderBuilder::new(train_batcher)
            .batch_size(self.config.batch_size)
            .shuffle(self.config.shuffle_seed)
            .num_workers(1)
            .build(train);

        // Validation runs on the inner backend: same device, no graph.
        let val_batcher =
            TaggingBatcher::<B::InnerBackend>::new(self.device.clone(), self.pad_token);
        let val_loader = DataLoaderBuilder::new(val_batcher)
            .batch_size(self.config.batch_size)
            .num_workers(1)
            .build(val);

        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
        let mut early = EarlyStopping::new(self.config.patience, self.config.min_delta);
        let mut best_model: Option<M> = None;
        let mut best_epoch: Option<usize> = None;
        let mut history = Vec::new();
        let mut stopped_early = false;
        let mut epochs_run = 0;

        println!(
            "Training {} for up to {} epochs ({} train / {} val samples)...",
            name, self.config.epochs, train_len, val_len
        );

        for epoch in 0..self.config.epochs {
            let (updated, train_metrics) =
                self.train_epoch(model, train_loader.as_ref(), &mut optim);
            model = updated;
            epochs_run = epoch + 1;

            let valid_model = model.valid();
            let val_metrics = evaluate(
                &valid_model,
                val_loader.as_ref(),
                self.heads,
                self.padding_label,
            );

            if !train_metrics.is_finite() {
                return Err(TrainingError::NonFiniteLoss {
                    split: "train",
                    epoch: epoch + 1,
                });
            }
            if !val_metrics.is_finite() {
                return Err(TrainingError::NonFiniteLoss {
                    split: "val",
                    epoch: epoch + 1,
                });
            }

            if early.observe(val_metrics.loss) {
                best_model = Some(model.clone());
                best_epoch = Some(epoch + 1);
                let metadata = CheckpointMetadata {
                    epoch: epoch + 1,
                    timestamp: unix_timestamp(),
                    model: name.to_string(),
                    metrics: CheckpointMetrics {
                        train_loss: train_metrics.loss,
                        val_loss: val_metrics.loss,
                        val_ast_accuracy: val_metrics.ast_accuracy,
                        val_symbol_accuracy: val_metrics.symbol_accuracy,
                        val_error_accuracy: val_metrics.error_accuracy,
                    },
                    arch: arch.clone(),
                };
                let path = self
                    .checkpoints
                    .save::<B::InnerBackend, _>(&valid_model, &metadata)?;
                tracing::info!(path = %path.display(), "checkpoint saved");
            }

            self.tracker.log_epoch(name, epoch, &train_metrics, &val_metrics)?;

            println!(
                "Epoch [{}/{}], Train Loss: {:.4}, Val Loss: {:.4}, \
                 Train AST Acc: {:.4}, Val AST Acc: {:.4}, \
                 Train Symbol Acc: {:.4}, Val Symbol Acc: {:.4}, \
                 Train Error Acc: {:.4}, Val Error Acc: {:.4}",
                epoch + 1,
                self.config.epochs,
                train_metrics.loss,
                val_metrics.loss,
                train_metrics.ast_accuracy,
                val_metrics.ast_accuracy,
                train_metrics.symbol_accuracy,
                val_metrics.symbol_accuracy,
                train_metrics.error_accuracy,
                val_metrics.error_accuracy,
            );

            history.push(EpochReport {
                epoch: epoch + 1,
                train: train_metrics,
                val: val_metrics,
            });

            if early.should_stop() {
                println!("Early stopping triggered after {} epochs", epoch + 1);
                stopped_early = true;
                break;
            }
        }

        if let Some(best) = best_model {
            model = best;
            println!("Loaded best model state from early stopping");
        }

        let outcome = FitOutcome {
            model_name: name.to_string(),
            epochs_run,
            stopped_early,
            best_epoch,
            best_val_loss: early.best_loss(),
            history,
        };
        Ok((model, outcome))
    }

    /// One gradient pass over the train split.
    fn train_epoch<M, O>(
        &self,
        mut model: M,
        loader: &dyn DataLoader<TokenBatch<B>>,
        optim: &mut O,
    ) -> (M, SplitMetrics)
    where
        M: AutodiffModule<B> + SequenceTagger<B>,
        O: Optimizer<M, B>,
    {
        let mut acc = EpochAccumulator::new();
        for batch in loader.iter() {
            let logits = model.forward(batch.tokens.clone(), batch.pad_mask.clone());
            let outcome = joint_masked_loss(logits, &batch, self.heads, self.padding_label);
            let loss: f64 = outcome.combined_loss.clone().into_scalar().elem::<f32>() as f64;

            let grads = outcome.combined_loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(self.config.learning_rate, model, grads);

            acc.record_batch(
                loss,
                outcome.ast_accuracy,
                outcome.symbol_accuracy,
                outcome.error_accuracy,
            );
        }
        (model, acc.finish())
    }
}

/// Scoring pass without gradient updates; also used by the evaluate binary
/// against a checkpointed model.
pub fn evaluate<B: Backend, M: SequenceTagger<B>>(
    model: &M,
    loader: &dyn DataLoader<TokenBatch<B>>,
    heads: HeadDims,
    padding_label: i32,
) -> SplitMetrics {
    let mut acc = EpochAccumulator::new();
    for batch in loader.iter() {
        let logits = model.forward(batch.tokens.clone(), batch.pad_mask.clone());
        let outcome = joint_masked_loss(logits, &batch, heads, padding_label);
        let loss: f64 = outcome.combined_loss.into_scalar().elem::<f32>() as f64;
        acc.record_batch(
            loss,
            outcome.ast_accuracy,
            outcome.symbol_accuracy,
            outcome.error_accuracy,
        );
    }
    acc.finish()
}
