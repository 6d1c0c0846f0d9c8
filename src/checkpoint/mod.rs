mod manager;
mod metadata;

pub use manager::{load_weights, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{unix_timestamp, CheckpointMetadata, CheckpointMetrics};
