//! Padding-aware loss and accuracy arithmetic shared by the train and
//! validation passes.

use burn::prelude::*;
use burn::tensor::activation::log_softmax;

use crate::data::TokenBatch;
use crate::model::{split_heads, HeadDims};

/// Mean cross entropy over the positions whose target is not
/// `padding_label`. Returns the loss tensor and the number of positions it
/// averaged over; with no valid position the loss is exactly zero (while
/// still attached to the graph) instead of undefined.
pub fn masked_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    padding_label: i32,
) -> (Tensor<B, 1>, usize) {
    let mask = targets.clone().not_equal_elem(padding_label);
    let valid = mask.clone().int().sum().into_scalar().elem::<i64>() as usize;
    if valid == 0 {
        return (logits.sum().mul_scalar(0.0), 0);
    }

    // Padded targets are -1 and cannot index the class dimension; point them
    // at class 0 and zero their contribution through the mask instead.
    let safe_targets = targets.mask_fill(mask.clone().bool_not(), 0);
    let picked = log_softmax(logits, 1)
        .gather(1, safe_targets.unsqueeze_dim::<2>(1))
        .squeeze::<1>(1);
    let nll = (-picked) * mask.float();

    (nll.sum().div_scalar(valid as f64), valid)
}

/// Fraction of positions whose predicted class matches a non-padding target.
/// The denominator is the full flattened position count, padding included.
pub fn masked_match_fraction<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    padding_label: i32,
) -> f64 {
    let [n, _classes] = logits.dims();
    if n == 0 {
        return 0.0;
    }

    let mask = targets.clone().not_equal_elem(padding_label);
    let preds = logits.argmax(1).squeeze::<1>(1);
    let hits = (preds.equal(targets).int() * mask.int())
        .sum()
        .into_scalar()
        .elem::<i64>();

    hits as f64 / n as f64
}

/// Per-batch joint outcome across the three label streams.
#[derive(Debug)]
pub struct BatchOutcome<B: Backend> {
    /// Sum of the three per-stream masked cross entropies.
    pub combined_loss: Tensor<B, 1>,
    pub ast_accuracy: f64,
    pub symbol_accuracy: f64,
    pub error_accuracy: f64,
}

/// Slice the joint logits into heads and score every stream against its own
/// mask. Each stream masks independently: a position may carry an AST label
/// but no symbol label.
pub fn joint_masked_loss<B: Backend>(
    logits: Tensor<B, 3>,
    batch: &TokenBatch<B>,
    heads: HeadDims,
    padding_label: i32,
) -> BatchOutcome<B> {
    let [batch_size, seq_len, _] = logits.dims();
    let positions = batch_size * seq_len;
    let split = split_heads(logits, heads);

    let ast_targets = batch.ast_targets.clone().reshape([positions]);
    let symbol_targets = batch.symbol_targets.clone().reshape([positions]);
    let error_targets = batch.error_targets.clone().reshape([positions]);

    let (ast_loss, _) = masked_cross_entropy(split.ast.clone(), ast_targets.clone(), padding_label);
    let (symbol_loss, _) =
        masked_cross_entropy(split.symbol.clone(), symbol_targets.clone(), padding_label);
    let (error_loss, _) =
        masked_cross_entropy(split.error.clone(), error_targets.clone(), padding_label);

    BatchOutcome {
        ast_accuracy: masked_match_fraction(split.ast, ast_targets, padding_label),
        symbol_accuracy: masked_match_fraction(split.symbol, symbol_targets, padding_label),
        error_accuracy: masked_match_fraction(split.error, error_targets, padding_label),
        combined_loss: ast_loss + symbol_loss + error_loss,
    }
}
