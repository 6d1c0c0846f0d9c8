use std::path::PathBuf;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors that can occur while building a corpus of labeled token streams.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read corpus file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed sample at {path}:{line}: {source}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("sample at line {line} has {tokens} tokens but {labels} {stream} labels")]
    LengthMismatch {
        line: usize,
        stream: &'static str,
        tokens: usize,
        labels: usize,
    },

    #[error("token id {id} at line {line} exceeds vocab size {vocab_size}")]
    TokenOutOfRange {
        line: usize,
        id: u32,
        vocab_size: usize,
    },

    #[error("{stream} label {label} at line {line} outside -1..{classes}")]
    LabelOutOfRange {
        line: usize,
        stream: &'static str,
        label: i32,
        classes: usize,
    },

    #[error("corpus contains no samples")]
    Empty,
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to save model weights: {0}")]
    ModelSave(String),

    #[error("failed to load model weights: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while writing experiment-tracking records.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("{split} dataset is empty")]
    EmptyDataset { split: &'static str },

    #[error("non-finite {split} loss at epoch {epoch}")]
    NonFiniteLoss { split: &'static str, epoch: usize },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("tracking error: {0}")]
    Tracking(#[from] TrackingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("training.epochs must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: training.epochs must be > 0"
        );
    }

    #[test]
    fn test_dataset_error_display() {
        let err = DatasetError::LengthMismatch {
            line: 3,
            stream: "symbol",
            tokens: 12,
            labels: 11,
        };
        assert_eq!(
            err.to_string(),
            "sample at line 3 has 12 tokens but 11 symbol labels"
        );

        let err = DatasetError::LabelOutOfRange {
            line: 7,
            stream: "ast",
            label: 9,
            classes: 9,
        };
        assert_eq!(err.to_string(), "ast label 9 at line 7 outside -1..9");
    }

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::NoLatestSymlink(PathBuf::from("checkpoints"));
        assert_eq!(err.to_string(), "no 'latest' symlink found in checkpoints");
    }

    #[test]
    fn test_training_error_display() {
        let err = TrainingError::NonFiniteLoss {
            split: "val",
            epoch: 4,
        };
        assert_eq!(err.to_string(), "non-finite val loss at epoch 4");
    }
}
