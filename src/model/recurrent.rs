use burn::nn::{
    BiLstm, BiLstmConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig,
};
use burn::prelude::*;

use crate::model::heads::{HeadDims, SequenceTagger};

/// Recurrent-baseline hyperparameters (`[recurrent]` section).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RecurrentConfig {
    pub d_model: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
}

impl Default for RecurrentConfig {
    fn default() -> Self {
        RecurrentConfig {
            d_model: 128,
            hidden_size: 128,
            num_layers: 2,
            dropout: 0.1,
        }
    }
}

impl RecurrentConfig {
    pub fn tagger_config(&self, vocab_size: usize, heads: HeadDims) -> RecurrentTaggerConfig {
        RecurrentTaggerConfig::new(vocab_size, heads)
            .with_d_model(self.d_model)
            .with_hidden_size(self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
    }
}

#[derive(Config, Debug)]
pub struct RecurrentTaggerConfig {
    pub vocab_size: usize,
    pub heads: HeadDims,
    #[config(default = 128)]
    pub d_model: usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl RecurrentTaggerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentTagger<B> {
        // The first layer reads embeddings, deeper layers read the
        // concatenated forward/backward states of the previous one.
        let layers = (0..self.num_layers)
            .map(|i| {
                let input_size = if i == 0 {
                    self.d_model
                } else {
                    2 * self.hidden_size
                };
                BiLstmConfig::new(input_size, self.hidden_size, true).init(device)
            })
            .collect();

        RecurrentTagger {
            embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            layers,
            output: LinearConfig::new(2 * self.hidden_size, self.heads.total()).init(device),
        }
    }
}

/// Bidirectional-recurrent baseline: embedding, stacked BiLSTM layers, and
/// the same joint head projection the transformer uses.
#[derive(Module, Debug)]
pub struct RecurrentTagger<B: Backend> {
    embedding: Embedding<B>,
    dropout: Dropout,
    layers: Vec<BiLstm<B>>,
    output: Linear<B>,
}

impl<B: Backend> SequenceTagger<B> for RecurrentTagger<B> {
    /// The pad mask is part of the tagger interface but recurrence simply
    /// runs over the padded length; padded positions are excluded later by
    /// the per-stream target masks.
    fn forward(&self, tokens: Tensor<B, 2, Int>, _pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let mut x = self.dropout.forward(self.embedding.forward(tokens));
        for layer in &self.layers {
            let (states, _) = layer.forward(x, None);
            x = self.dropout.forward(states);
        }
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = RecurrentTaggerConfig::new(16, HeadDims::new(3, 2, 2))
            .with_d_model(8)
            .with_hidden_size(6)
            .with_num_layers(2)
            .with_dropout(0.0)
            .init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 1, Int>::from_ints(
            [1, 2, 3, 4, 5, 0, 0, 0, 6, 7, 8, 9, 10, 11, 0, 0],
            &device,
        )
        .reshape([2, 8]);
        let pad_mask = input.clone().equal_elem(0);

        let logits = model.forward(input, pad_mask);
        assert_eq!(logits.dims(), [2, 8, 7]);
    }

    #[test]
    fn test_single_layer_shape() {
        let device = Default::default();
        let model = RecurrentTaggerConfig::new(12, HeadDims::new(2, 2, 2))
            .with_d_model(4)
            .with_hidden_size(4)
            .with_num_layers(1)
            .with_dropout(0.0)
            .init::<TestBackend>(&device);

        let input =
            Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 0], &device).reshape([1, 4]);
        let pad_mask = input.clone().equal_elem(0);

        let logits = model.forward(input, pad_mask);
        assert_eq!(logits.dims(), [1, 4, 6]);
    }
}
