use serde::{Deserialize, Serialize};

/// Metrics of one pass over a split: the combined loss and the per-stream
/// accuracies, each averaged over the batches of the pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub loss: f64,
    pub ast_accuracy: f64,
    pub symbol_accuracy: f64,
    pub error_accuracy: f64,
}

impl SplitMetrics {
    pub fn is_finite(&self) -> bool {
        self.loss.is_finite()
            && self.ast_accuracy.is_finite()
            && self.symbol_accuracy.is_finite()
            && self.error_accuracy.is_finite()
    }
}

/// Accumulates per-batch scalars during one pass and averages them at the
/// end. Every batch weighs the same regardless of its size; a short final
/// batch counts like a full one.
#[derive(Debug, Default)]
pub struct EpochAccumulator {
    loss_sum: f64,
    ast_sum: f64,
    symbol_sum: f64,
    error_sum: f64,
    batches: usize,
}

impl EpochAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&mut self, loss: f64, ast: f64, symbol: f64, error: f64) {
        self.loss_sum += loss;
        self.ast_sum += ast;
        self.symbol_sum += symbol;
        self.error_sum += error;
        self.batches += 1;
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn finish(self) -> SplitMetrics {
        let n = self.batches.max(1) as f64;
        SplitMetrics {
            loss: self.loss_sum / n,
            ast_accuracy: self.ast_sum / n,
            symbol_accuracy: self.symbol_sum / n,
            error_accuracy: self.error_sum / n,
        }
    }
}

/// One epoch of the fit loop, kept for the returned history. `epoch` is
/// 1-based here; the tracker logs the 0-based step separately.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub train: SplitMetrics,
    pub val: SplitMetrics,
}
