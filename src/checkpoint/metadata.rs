use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;
use crate::model::ArchSpec;

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub train_loss: f64,
    pub val_loss: f64,
    pub val_ast_accuracy: f64,
    pub val_symbol_accuracy: f64,
    pub val_error_accuracy: f64,
}

/// Top-level checkpoint metadata written to metadata.json. Carries the full
/// architecture spec so the model can be rebuilt for evaluation without the
/// config file that trained it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// 1-based epoch the weights were taken from.
    pub epoch: usize,
    pub timestamp: u64,
    pub model: String,
    pub metrics: CheckpointMetrics,
    pub arch: ArchSpec,
}

impl CheckpointMetadata {
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Seconds since the Unix epoch; 0 if the clock sits before it.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
