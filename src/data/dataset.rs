use burn::data::dataset::Dataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One labeled token stream. All four arrays have the same length; a label
/// of `padding_label` (conventionally -1) marks a position that carries no
/// label in that stream, and is also the fill value used when padding.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenSample {
    pub tokens: Vec<u32>,
    #[serde(rename = "ast")]
    pub ast_labels: Vec<i32>,
    #[serde(rename = "symbol")]
    pub symbol_labels: Vec<i32>,
    #[serde(rename = "error")]
    pub error_labels: Vec<i32>,
}

impl TokenSample {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Truncate or right-pad every stream to exactly `len` positions.
    pub fn pad_to(&mut self, len: usize, pad_token: u32, padding_label: i32) {
        self.tokens.truncate(len);
        self.tokens.resize(len, pad_token);
        for labels in [
            &mut self.ast_labels,
            &mut self.symbol_labels,
            &mut self.error_labels,
        ] {
            labels.truncate(len);
            labels.resize(len, padding_label);
        }
    }
}

/// In-memory dataset of uniformly padded samples.
pub struct TaggingDataset {
    samples: Vec<TokenSample>,
}

impl TaggingDataset {
    pub fn new(
        mut samples: Vec<TokenSample>,
        max_seq_len: usize,
        pad_token: u32,
        padding_label: i32,
    ) -> Self {
        for sample in &mut samples {
            sample.pad_to(max_seq_len, pad_token, padding_label);
        }
        TaggingDataset { samples }
    }
}

impl Dataset<TokenSample> for TaggingDataset {
    fn get(&self, index: usize) -> Option<TokenSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Shuffle with a seeded RNG and split off the validation tail.
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let val_len = ((total as f64) * val_fraction).round() as usize;
    let val = samples.split_off(total - val_len.min(total));

    (samples, val)
}
