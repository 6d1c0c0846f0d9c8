use std::path::Path;

use crate::checkpoint::CheckpointManagerConfig;
use crate::data::DataConfig;
use crate::error::ConfigError;
use crate::model::{RecurrentConfig, TransformerConfig};
use crate::tracking::TrackingConfig;
use crate::training::trainer::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub transformer: TransformerConfig,
    pub recurrent: RecurrentConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
    pub tracking: TrackingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data: DataConfig::default(),
            transformer: TransformerConfig::default(),
            recurrent: RecurrentConfig::default(),
            training: TrainerConfig::default(),
            checkpoint: CheckpointManagerConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            eprintln!(
                "Warning: config file '{}' not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.max_seq_len == 0 {
            return Err(ConfigError::Validation(
                "data.max_seq_len must be > 0".into(),
            ));
        }
        if self.data.vocab_size == 0 {
            return Err(ConfigError::Validation(
                "data.vocab_size must be > 0".into(),
            ));
        }
        if self.data.pad_token as usize >= self.data.vocab_size {
            return Err(ConfigError::Validation(
                "data.pad_token must be < data.vocab_size".into(),
            ));
        }
        if self.data.padding_label >= 0 {
            return Err(ConfigError::Validation(
                "data.padding_label must be negative".into(),
            ));
        }
        if self.data.ast_classes == 0 {
            return Err(ConfigError::Validation(
                "data.ast_classes must be > 0".into(),
            ));
        }
        if self.data.symbol_classes == 0 {
            return Err(ConfigError::Validation(
                "data.symbol_classes must be > 0".into(),
            ));
        }
        if self.data.error_classes == 0 {
            return Err(ConfigError::Validation(
                "data.error_classes must be > 0".into(),
            ));
        }
        if self.data.val_fraction <= 0.0 || self.data.val_fraction >= 1.0 {
            return Err(ConfigError::Validation(
                "data.val_fraction must be in (0, 1)".into(),
            ));
        }
        if self.data.train_jsonl.is_none() && self.data.synthetic_samples == 0 {
            return Err(ConfigError::Validation(
                "data.synthetic_samples must be > 0 when no data.train_jsonl is set".into(),
            ));
        }

        if self.transformer.d_model == 0 {
            return Err(ConfigError::Validation(
                "transformer.d_model must be > 0".into(),
            ));
        }
        if self.transformer.num_heads == 0 {
            return Err(ConfigError::Validation(
                "transformer.num_heads must be >= 1".into(),
            ));
        }
        if self.transformer.d_model % self.transformer.num_heads != 0 {
            return Err(ConfigError::Validation(
                "transformer.d_model must be divisible by transformer.num_heads".into(),
            ));
        }
        if self.transformer.num_layers == 0 {
            return Err(ConfigError::Validation(
                "transformer.num_layers must be >= 1".into(),
            ));
        }
        if self.transformer.d_ff == 0 {
            return Err(ConfigError::Validation(
                "transformer.d_ff must be > 0".into(),
            ));
        }
        if self.transformer.dropout < 0.0 || self.transformer.dropout >= 1.0 {
            return Err(ConfigError::Validation(
                "transformer.dropout must be in [0, 1)".into(),
            ));
        }

        if self.recurrent.d_model == 0 {
            return Err(ConfigError::Validation(
                "recurrent.d_model must be > 0".into(),
            ));
        }
        if self.recurrent.hidden_size == 0 {
            return Err(ConfigError::Validation(
                "recurrent.hidden_size must be > 0".into(),
            ));
        }
        if self.recurrent.num_layers == 0 {
            return Err(ConfigError::Validation(
                "recurrent.num_layers must be >= 1".into(),
            ));
        }
        if self.recurrent.dropout < 0.0 || self.recurrent.dropout >= 1.0 {
            return Err(ConfigError::Validation(
                "recurrent.dropout must be in [0, 1)".into(),
            ));
        }

        if self.training.epochs == 0 {
            return Err(ConfigError::Validation(
                "training.epochs must be > 0".into(),
            ));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::Validation(
                "training.batch_size must be > 0".into(),
            ));
        }
        if self.training.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "training.learning_rate must be > 0".into(),
            ));
        }
        if self.training.patience == 0 {
            return Err(ConfigError::Validation(
                "training.patience must be >= 1".into(),
            ));
        }
        if self.training.min_delta < 0.0 {
            return Err(ConfigError::Validation(
                "training.min_delta must be >= 0".into(),
            ));
        }

        if self.checkpoint.keep_last_n == 0 {
            return Err(ConfigError::Validation(
                "checkpoint.keep_last_n must be >= 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[training]
learning_rate = 0.01
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.training.learning_rate - 0.01).abs() < 1e-9);
        // Other fields should be defaults
        assert_eq!(config.training.patience, 5);
        assert_eq!(config.data.padding_label, -1);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert!((config.training.learning_rate - default.training.learning_rate).abs() < 1e-9);
        assert_eq!(config.data.max_seq_len, default.data.max_seq_len);
    }

    #[test]
    fn test_validation_rejects_zero_epochs() {
        let mut config = AppConfig::default();
        config.training.epochs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.training.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_patience() {
        let mut config = AppConfig::default();
        config.training.patience = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_min_delta() {
        let mut config = AppConfig::default();
        config.training.min_delta = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_nonnegative_padding_label() {
        let mut config = AppConfig::default();
        config.data.padding_label = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_pad_token_outside_vocab() {
        let mut config = AppConfig::default();
        config.data.pad_token = config.data.vocab_size as u32;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_val_fraction_bounds() {
        let mut config = AppConfig::default();
        config.data.val_fraction = 0.0;
        assert!(config.validate().is_err());
        config.data.val_fraction = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_indivisible_heads() {
        let mut config = AppConfig::default();
        config.transformer.d_model = 130;
        config.transformer.num_heads = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_dropout_of_one() {
        let mut config = AppConfig::default();
        config.recurrent.dropout = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_recurrent_layers() {
        let mut config = AppConfig::default();
        config.recurrent.num_layers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_keep_last() {
        let mut config = AppConfig::default();
        config.checkpoint.keep_last_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_synthetic_samples_without_jsonl() {
        let mut config = AppConfig::default();
        config.data.train_jsonl = None;
        config.data.synthetic_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.training.patience, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[training]
epochs = 7

[data]
max_seq_len = 32
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.epochs, 7);
        assert_eq!(config.data.max_seq_len, 32);
        // Others are defaults
        assert_eq!(config.transformer.num_heads, 4);
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config
            .validate()
            .expect("roundtripped config should be valid");
    }
}
