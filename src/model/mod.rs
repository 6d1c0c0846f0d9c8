//! The two tagging architectures under comparison and their shared
//! output-head layout.

pub mod heads;
pub mod recurrent;
pub mod transformer;

pub use heads::{split_heads, HeadDims, HeadLogits, SequenceTagger};
pub use recurrent::{RecurrentConfig, RecurrentTagger, RecurrentTaggerConfig};
pub use transformer::{TransformerConfig, TransformerTagger, TransformerTaggerConfig};

/// Serializable architecture description, stored in checkpoint metadata so a
/// saved model can be rebuilt without the original config file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "arch", rename_all = "snake_case")]
pub enum ArchSpec {
    Transformer(TransformerTaggerConfig),
    Recurrent(RecurrentTaggerConfig),
}

impl ArchSpec {
    pub fn name(&self) -> &'static str {
        match self {
            ArchSpec::Transformer(_) => "transformer",
            ArchSpec::Recurrent(_) => "recurrent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_spec_roundtrips_with_tag() {
        let spec = ArchSpec::Recurrent(RecurrentTaggerConfig::new(32, HeadDims::new(4, 3, 2)));
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains(r#""arch":"recurrent""#));

        let back: ArchSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "recurrent");
        match back {
            ArchSpec::Recurrent(cfg) => {
                assert_eq!(cfg.vocab_size, 32);
                assert_eq!(cfg.heads, HeadDims::new(4, 3, 2));
            }
            other => panic!("decoded wrong arch: {}", other.name()),
        }
    }
}
