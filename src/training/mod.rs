//! The supervised training loop: padding-aware loss arithmetic, per-epoch
//! metric aggregation, early stopping, and the session driver that ties them
//! to the tracker and checkpoint store.

pub mod early_stopping;
pub mod loss;
pub mod metrics;
pub mod trainer;

pub use early_stopping::EarlyStopping;
pub use loss::{joint_masked_loss, masked_cross_entropy, masked_match_fraction, BatchOutcome};
pub use metrics::{EpochAccumulator, EpochReport, SplitMetrics};
pub use trainer::{evaluate, FitOutcome, TrainSession, TrainerConfig};
