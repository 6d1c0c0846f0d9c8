use std::ops::Range;

use burn::prelude::*;

/// A model that maps a `[batch, seq]` stream of token ids to joint logits
/// `[batch, seq, HeadDims::total()]`. `pad_mask` is true at padded positions.
pub trait SequenceTagger<B: Backend> {
    fn forward(&self, tokens: Tensor<B, 2, Int>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3>;
}

/// Class counts of the three label streams, in the order they tile the last
/// logits dimension: AST node kinds, then symbol kinds, then error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HeadDims {
    pub ast: usize,
    pub symbol: usize,
    pub error: usize,
}

impl HeadDims {
    pub fn new(ast: usize, symbol: usize, error: usize) -> Self {
        HeadDims { ast, symbol, error }
    }

    pub fn total(&self) -> usize {
        self.ast + self.symbol + self.error
    }

    fn ast_range(&self) -> Range<usize> {
        0..self.ast
    }

    fn symbol_range(&self) -> Range<usize> {
        self.ast..self.ast + self.symbol
    }

    fn error_range(&self) -> Range<usize> {
        self.ast + self.symbol..self.total()
    }
}

/// Per-stream logits, flattened to `[batch * seq, classes]`.
#[derive(Debug, Clone)]
pub struct HeadLogits<B: Backend> {
    pub ast: Tensor<B, 2>,
    pub symbol: Tensor<B, 2>,
    pub error: Tensor<B, 2>,
}

/// Slice the joint logits into the three heads and flatten the positions,
/// matching the target layout `[batch * seq]`.
pub fn split_heads<B: Backend>(logits: Tensor<B, 3>, heads: HeadDims) -> HeadLogits<B> {
    let [batch, seq, total] = logits.dims();
    debug_assert_eq!(total, heads.total());

    let slice = |range: Range<usize>| {
        let width = range.len();
        logits
            .clone()
            .slice([0..batch, 0..seq, range])
            .reshape([batch * seq, width])
    };

    HeadLogits {
        ast: slice(heads.ast_range()),
        symbol: slice(heads.symbol_range()),
        error: slice(heads.error_range()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn test_ranges_tile_the_last_dimension() {
        let heads = HeadDims::new(9, 4, 3);
        assert_eq!(heads.total(), 16);
        assert_eq!(heads.ast_range(), 0..9);
        assert_eq!(heads.symbol_range(), 9..13);
        assert_eq!(heads.error_range(), 13..16);
    }

    #[test]
    fn test_split_heads_shapes_and_values() {
        let heads = HeadDims::new(2, 1, 1);
        let device = Default::default();
        // batch=1, seq=2, total=4: positions are [0,1,2,3] and [4,5,6,7].
        let logits = Tensor::<TestBackend, 1>::from_floats(
            [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
            &device,
        )
        .reshape([1, 2, 4]);

        let split = split_heads(logits, heads);
        assert_eq!(split.ast.dims(), [2, 2]);
        assert_eq!(split.symbol.dims(), [2, 1]);
        assert_eq!(split.error.dims(), [2, 1]);

        let ast: Vec<f32> = split.ast.into_data().to_vec().unwrap();
        assert_eq!(ast, vec![0.0, 1.0, 4.0, 5.0]);
        let symbol: Vec<f32> = split.symbol.into_data().to_vec().unwrap();
        assert_eq!(symbol, vec![2.0, 6.0]);
        let error: Vec<f32> = split.error.into_data().to_vec().unwrap();
        assert_eq!(error, vec![3.0, 7.0]);
    }
}
