//! File-backed experiment tracking. Each run gets its own directory with a
//! `run.json` config snapshot and a `metrics.jsonl` stream, one JSON object
//! per logged step.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::training::metrics::SplitMetrics;

/// `[tracking]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub dir: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            dir: PathBuf::from("runs"),
        }
    }
}

/// Handle on one tracked run. Metric lines are flushed as they are written.
pub struct RunTracker {
    run_dir: PathBuf,
    metrics: File,
}

impl RunTracker {
    /// Start a run under `dir/run_name`, snapshotting the configuration that
    /// produced it.
    pub fn create<C: Serialize>(
        dir: &Path,
        run_name: &str,
        config: &C,
    ) -> Result<Self, TrackingError> {
        let run_dir = dir.join(run_name);
        fs::create_dir_all(&run_dir)?;

        let descriptor = serde_json::json!({
            "run_name": run_name,
            "started_at": crate::checkpoint::unix_timestamp(),
            "config": config,
        });
        fs::write(
            run_dir.join("run.json"),
            serde_json::to_string_pretty(&descriptor)?,
        )?;

        let metrics = OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join("metrics.jsonl"))?;

        Ok(RunTracker { run_dir, metrics })
    }

    /// Log one epoch of a named model. Keys are prefixed with the model name
    /// so several models can share a run; `step` is the 0-based epoch.
    pub fn log_epoch(
        &mut self,
        model_name: &str,
        step: usize,
        train: &SplitMetrics,
        val: &SplitMetrics,
    ) -> Result<(), TrackingError> {
        let mut record = serde_json::Map::new();
        record.insert("step".into(), step.into());
        record.insert(format!("{model_name}_train_loss"), train.loss.into());
        record.insert(
            format!("{model_name}_train_ast_accuracy"),
            train.ast_accuracy.into(),
        );
        record.insert(
            format!("{model_name}_train_symbol_accuracy"),
            train.symbol_accuracy.into(),
        );
        record.insert(
            format!("{model_name}_train_error_accuracy"),
            train.error_accuracy.into(),
        );
        record.insert(format!("{model_name}_val_loss"), val.loss.into());
        record.insert(
            format!("{model_name}_val_ast_accuracy"),
            val.ast_accuracy.into(),
        );
        record.insert(
            format!("{model_name}_val_symbol_accuracy"),
            val.symbol_accuracy.into(),
        );
        record.insert(
            format!("{model_name}_val_error_accuracy"),
            val.error_accuracy.into(),
        );

        let line = serde_json::to_string(&record)?;
        writeln!(self.metrics, "{line}")?;
        self.metrics.flush()?;
        Ok(())
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(loss: f64) -> SplitMetrics {
        SplitMetrics {
            loss,
            ast_accuracy: 0.5,
            symbol_accuracy: 0.25,
            error_accuracy: 0.75,
        }
    }

    #[test]
    fn test_create_writes_run_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let config = serde_json::json!({ "learning_rate": 0.001 });
        let tracker = RunTracker::create(dir.path(), "run_1", &config).unwrap();

        let raw = std::fs::read_to_string(tracker.run_dir().join("run.json")).unwrap();
        let descriptor: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(descriptor["run_name"], "run_1");
        assert_eq!(descriptor["config"]["learning_rate"], 0.001);
    }

    #[test]
    fn test_log_epoch_appends_prefixed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker =
            RunTracker::create(dir.path(), "run_1", &serde_json::json!({})).unwrap();

        tracker
            .log_epoch("transformer", 0, &metrics(1.5), &metrics(2.0))
            .unwrap();
        tracker
            .log_epoch("transformer", 1, &metrics(1.2), &metrics(1.8))
            .unwrap();

        let raw = std::fs::read_to_string(tracker.run_dir().join("metrics.jsonl")).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        // step plus the eight prefixed metric keys, nothing else.
        assert_eq!(first.as_object().unwrap().len(), 9);
        assert_eq!(first["step"], 0);
        assert_eq!(first["transformer_train_loss"], 1.5);
        assert_eq!(first["transformer_val_loss"], 2.0);
        assert_eq!(first["transformer_val_ast_accuracy"], 0.5);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["step"], 1);
        assert_eq!(second["transformer_train_loss"], 1.2);
    }

    #[test]
    fn test_two_models_share_one_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker =
            RunTracker::create(dir.path(), "run_1", &serde_json::json!({})).unwrap();

        tracker
            .log_epoch("transformer", 0, &metrics(1.0), &metrics(1.1))
            .unwrap();
        tracker
            .log_epoch("recurrent", 0, &metrics(0.9), &metrics(1.0))
            .unwrap();

        let raw = std::fs::read_to_string(tracker.run_dir().join("metrics.jsonl")).unwrap();
        let second: serde_json::Value = serde_json::from_str(raw.lines().nth(1).unwrap()).unwrap();
        assert_eq!(second["recurrent_train_loss"], 0.9);
        assert!(second.get("transformer_train_loss").is_none());
    }
}
