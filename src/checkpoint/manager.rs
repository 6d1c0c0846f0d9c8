use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::DefaultRecorder;

use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::CheckpointError;

/// Configuration for the checkpoint manager (`[checkpoint]` config section).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            dir: PathBuf::from("checkpoints"),
            keep_last_n: 3,
            keep_best_n: 2,
        }
    }
}

/// Manages saving, listing, and pruning model checkpoints. Each model name
/// gets its own subdirectory with per-epoch checkpoints and a `latest`
/// symlink.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        fs::create_dir_all(&config.dir).ok();
        CheckpointManager { config }
    }

    /// Save model weights and metadata under
    /// `{dir}/{model}/checkpoint_{epoch:04}`.
    pub fn save<B: Backend, M: Module<B>>(
        &self,
        model: &M,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf, CheckpointError> {
        let model_dir = self.config.dir.join(&metadata.model);
        let dir_name = format!("checkpoint_{:04}", metadata.epoch);
        let tmp_dir = model_dir.join(format!("{}.tmp", dir_name));
        let final_dir = model_dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;

        model
            .clone()
            .save_file(tmp_dir.join("model"), &DefaultRecorder::default())
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
        metadata.save(&tmp_dir.join("metadata.json"))?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&model_dir, &dir_name)?;
        self.prune(&model_dir)?;

        Ok(final_dir)
    }

    /// Resolve the newest checkpoint directory for a model, preferring the
    /// `latest` symlink and falling back to a directory scan.
    pub fn latest(&self, model_name: &str) -> Result<PathBuf, CheckpointError> {
        let model_dir = self.config.dir.join(model_name);
        if !model_dir.is_dir() {
            return Err(CheckpointError::DirNotFound(model_dir));
        }

        let link = model_dir.join("latest");
        if link.symlink_metadata().is_ok() {
            let resolved = fs::read_link(&link)?;
            let target = if resolved.is_relative() {
                model_dir.join(resolved)
            } else {
                resolved
            };
            if target.is_dir() {
                return Ok(target);
            }
        }

        self.list(model_name)?
            .pop()
            .map(|(path, _)| path)
            .ok_or(CheckpointError::NoLatestSymlink(model_dir))
    }

    /// List a model's checkpoints sorted by epoch (ascending).
    pub fn list(
        &self,
        model_name: &str,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let model_dir = self.config.dir.join(model_name);
        if !model_dir.is_dir() {
            return Err(CheckpointError::DirNotFound(model_dir));
        }

        let mut results = Vec::new();
        for entry in fs::read_dir(&model_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join("metadata.json");
            if meta_path.exists() {
                results.push((path, CheckpointMetadata::load(&meta_path)?));
            }
        }
        results.sort_by_key(|(_, m)| m.epoch);
        Ok(results)
    }

    /// Keep the union of the last N checkpoints by epoch and the best N by
    /// validation loss; delete the rest.
    fn prune(&self, model_dir: &Path) -> Result<(), CheckpointError> {
        let model_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let checkpoints = self.list(&model_name)?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: std::collections::HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_val_loss: Vec<(usize, f64)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.val_loss))
            .collect();
        by_val_loss.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        for (i, _) in by_val_loss.iter().take(self.config.keep_best_n) {
            keep.insert(*i);
        }

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    fn update_latest_symlink(
        &self,
        model_dir: &Path,
        dir_name: &str,
    ) -> Result<(), CheckpointError> {
        let link_path = model_dir.join("latest");
        if link_path.exists() || link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

/// Load weights from a checkpoint directory into a freshly initialized model.
pub fn load_weights<B: Backend, M: Module<B>>(
    checkpoint_dir: &Path,
    model: M,
    device: &B::Device,
) -> Result<M, CheckpointError> {
    model
        .load_file(checkpoint_dir.join("model"), &DefaultRecorder::default(), device)
        .map_err(|e| CheckpointError::ModelLoad(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::metadata::CheckpointMetrics;
    use crate::model::{ArchSpec, HeadDims, RecurrentTagger, RecurrentTaggerConfig};

    type TestBackend = burn::backend::NdArray<f32>;

    fn tiny_model_config() -> RecurrentTaggerConfig {
        RecurrentTaggerConfig::new(47, HeadDims::new(9, 4, 3))
            .with_d_model(8)
            .with_hidden_size(8)
            .with_num_layers(1)
    }

    fn test_metadata(epoch: usize, val_loss: f64) -> CheckpointMetadata {
        CheckpointMetadata {
            epoch,
            timestamp: 1700000000 + epoch as u64,
            model: "recurrent".to_string(),
            metrics: CheckpointMetrics {
                train_loss: val_loss * 0.9,
                val_loss,
                val_ast_accuracy: 0.8,
                val_symbol_accuracy: 0.7,
                val_error_accuracy: 0.9,
            },
            arch: ArchSpec::Recurrent(tiny_model_config()),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(CheckpointManagerConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        let device = Default::default();
        let model: RecurrentTagger<TestBackend> = tiny_model_config().init(&device);

        let path = manager.save(&model, &test_metadata(1, 0.5)).unwrap();
        assert!(path.exists());
        assert!(path.join("model.mpk").exists());
        assert!(path.join("metadata.json").exists());

        let fresh: RecurrentTagger<TestBackend> = tiny_model_config().init(&device);
        load_weights(&path, fresh, &device).unwrap();
    }

    #[test]
    fn test_latest_tracks_newest_save() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(CheckpointManagerConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        let device = Default::default();
        let model: RecurrentTagger<TestBackend> = tiny_model_config().init(&device);
        manager.save(&model, &test_metadata(1, 0.5)).unwrap();
        manager.save(&model, &test_metadata(2, 0.4)).unwrap();

        let latest = manager.latest("recurrent").unwrap();
        let metadata = CheckpointMetadata::load(&latest.join("metadata.json")).unwrap();
        assert_eq!(metadata.epoch, 2);
    }

    #[test]
    fn test_latest_without_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(CheckpointManagerConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        let err = manager.latest("recurrent").unwrap_err();
        assert!(matches!(err, CheckpointError::DirNotFound(_)));
    }

    #[test]
    fn test_pruning_keeps_recent_and_best() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(CheckpointManagerConfig {
            dir: dir.path().to_path_buf(),
            keep_last_n: 2,
            keep_best_n: 1,
        });

        let device = Default::default();
        let model: RecurrentTagger<TestBackend> = tiny_model_config().init(&device);

        // Epoch 2 has the lowest validation loss.
        for (epoch, val_loss) in [(1, 0.50), (2, 0.10), (3, 0.45), (4, 0.40), (5, 0.35)] {
            manager.save(&model, &test_metadata(epoch, val_loss)).unwrap();
        }

        let list = manager.list("recurrent").unwrap();
        let epochs: Vec<usize> = list.iter().map(|(_, m)| m.epoch).collect();
        assert_eq!(epochs, vec![2, 4, 5]);
    }
}
