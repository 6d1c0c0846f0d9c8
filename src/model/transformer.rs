use burn::nn::attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig};
use burn::nn::{
    Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
    LinearConfig,
};
use burn::prelude::*;
use burn::tensor::activation::gelu;

use crate::model::heads::{HeadDims, SequenceTagger};

/// Transformer hyperparameters (`[transformer]` section).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    pub d_model: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    pub d_ff: usize,
    pub dropout: f64,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        TransformerConfig {
            d_model: 128,
            num_heads: 4,
            num_layers: 2,
            d_ff: 256,
            dropout: 0.1,
        }
    }
}

impl TransformerConfig {
    /// Combine the hyperparameter section with the corpus dimensions into a
    /// full module config.
    pub fn tagger_config(
        &self,
        vocab_size: usize,
        max_seq_len: usize,
        heads: HeadDims,
    ) -> TransformerTaggerConfig {
        TransformerTaggerConfig::new(vocab_size, max_seq_len, heads)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
    }
}

#[derive(Config, Debug)]
pub struct TransformerTaggerConfig {
    pub vocab_size: usize,
    pub max_seq_len: usize,
    pub heads: HeadDims,
    #[config(default = 128)]
    pub d_model: usize,
    #[config(default = 4)]
    pub num_heads: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = 256)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl TransformerTaggerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerTagger<B> {
        TransformerTagger {
            token_embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            blocks: (0..self.num_layers).map(|_| self.block(device)).collect(),
            norm: LayerNormConfig::new(self.d_model).init(device),
            output: LinearConfig::new(self.d_model, self.heads.total()).init(device),
        }
    }

    fn block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            attention: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            norm_attn: LayerNormConfig::new(self.d_model).init(device),
            ff_in: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ff_out: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm_ff: LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Encoder over token + learned position embeddings, projecting every
/// position to the concatenated AST/symbol/error class logits.
#[derive(Module, Debug)]
pub struct TransformerTagger<B: Backend> {
    token_embedding: Embedding<B>,
    position_embedding: Embedding<B>,
    dropout: Dropout,
    blocks: Vec<EncoderBlock<B>>,
    norm: LayerNorm<B>,
    output: Linear<B>,
}

#[derive(Module, Debug)]
struct EncoderBlock<B: Backend> {
    attention: MultiHeadAttention<B>,
    norm_attn: LayerNorm<B>,
    ff_in: Linear<B>,
    ff_out: Linear<B>,
    norm_ff: LayerNorm<B>,
    dropout: Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attended = self.attention.forward(attn_input).context;
        let x = self.norm_attn.forward(x + self.dropout.forward(attended));

        let ff = self.ff_out.forward(gelu(self.ff_in.forward(x.clone())));
        self.norm_ff.forward(x + self.dropout.forward(ff))
    }
}

impl<B: Backend> SequenceTagger<B> for TransformerTagger<B> {
    fn forward(&self, tokens: Tensor<B, 2, Int>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();

        let token_emb = self.token_embedding.forward(tokens);
        // Self-attention carries no order information by itself.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &token_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(token_emb + pos_emb);
        for block in &self.blocks {
            x = block.forward(x, pad_mask.clone());
        }
        self.output.forward(self.norm.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    fn tiny_config() -> TransformerTaggerConfig {
        TransformerTaggerConfig::new(16, 8, HeadDims::new(3, 2, 2))
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
            .with_dropout(0.0)
    }

    fn tokens(values: &[i32], batch: usize, seq: usize) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &Default::default())
            .reshape([batch, seq])
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = tiny_config().init::<TestBackend>(&device);
        let input = tokens(&[1, 2, 3, 4, 5, 0, 0, 0, 6, 7, 8, 9, 10, 11, 0, 0], 2, 8);
        let pad_mask = input.clone().equal_elem(0);

        let logits = model.forward(input, pad_mask);
        assert_eq!(logits.dims(), [2, 8, 7]);
    }

    #[test]
    fn test_padded_tail_does_not_leak_into_valid_positions() {
        let device = Default::default();
        let model = tiny_config().init::<TestBackend>(&device);

        // Same three valid tokens, different garbage beyond them; the pad
        // mask marks the tail in both cases.
        let a = tokens(&[1, 2, 3, 4, 4, 4, 4, 4], 1, 8);
        let b = tokens(&[1, 2, 3, 9, 10, 11, 12, 13], 1, 8);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints(
            [0, 0, 0, 1, 1, 1, 1, 1],
            &device,
        )
        .reshape([1, 8])
        .equal_elem(1);

        let out_a = model.forward(a, mask.clone());
        let out_b = model.forward(b, mask);

        let valid_a: Vec<f32> = out_a
            .slice([0..1, 0..3, 0..7])
            .into_data()
            .to_vec()
            .unwrap();
        let valid_b: Vec<f32> = out_b
            .slice([0..1, 0..3, 0..7])
            .into_data()
            .to_vec()
            .unwrap();
        for (x, y) in valid_a.iter().zip(&valid_b) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }
}
