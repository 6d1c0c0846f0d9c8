use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::data::dataset::TokenSample;

/// Collates pre-padded samples into the tensors one training step consumes.
#[derive(Clone, Debug)]
pub struct TaggingBatcher<B: Backend> {
    device: B::Device,
    pad_token: i32,
}

impl<B: Backend> TaggingBatcher<B> {
    pub fn new(device: B::Device, pad_token: u32) -> Self {
        TaggingBatcher {
            device,
            pad_token: pad_token as i32,
        }
    }
}

/// One collated batch. `pad_mask` is true at padded token positions and is
/// consumed by attention; per-stream label masks are derived later from the
/// target tensors themselves, since a stream may be unlabeled at positions
/// that still carry a real token.
#[derive(Clone, Debug)]
pub struct TokenBatch<B: Backend> {
    pub tokens: Tensor<B, 2, Int>,
    pub pad_mask: Tensor<B, 2, Bool>,
    pub ast_targets: Tensor<B, 2, Int>,
    pub symbol_targets: Tensor<B, 2, Int>,
    pub error_targets: Tensor<B, 2, Int>,
}

impl<B: Backend> Batcher<TokenSample, TokenBatch<B>> for TaggingBatcher<B> {
    fn batch(&self, items: Vec<TokenSample>) -> TokenBatch<B> {
        let batch_size = items.len();
        let seq_len = items.first().map(TokenSample::len).unwrap_or_default();

        let mut tokens = Vec::with_capacity(batch_size * seq_len);
        let mut ast = Vec::with_capacity(batch_size * seq_len);
        let mut symbol = Vec::with_capacity(batch_size * seq_len);
        let mut error = Vec::with_capacity(batch_size * seq_len);
        for item in &items {
            tokens.extend(item.tokens.iter().map(|&t| t as i32));
            ast.extend_from_slice(&item.ast_labels);
            symbol.extend_from_slice(&item.symbol_labels);
            error.extend_from_slice(&item.error_labels);
        }

        let to_tensor = |values: Vec<i32>| {
            Tensor::<B, 1, Int>::from_ints(values.as_slice(), &self.device)
                .reshape([batch_size, seq_len])
        };

        let tokens = to_tensor(tokens);
        let pad_mask = tokens.clone().equal_elem(self.pad_token);

        TokenBatch {
            tokens,
            pad_mask,
            ast_targets: to_tensor(ast),
            symbol_targets: to_tensor(symbol),
            error_targets: to_tensor(error),
        }
    }
}
