/// Early stopping on validation loss. An epoch counts as an improvement only
/// when its loss undercuts the best seen so far by more than `min_delta`;
/// anything else increments the stale counter.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best_loss: f64,
    stale_epochs: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        EarlyStopping {
            patience,
            min_delta,
            best_loss: f64::INFINITY,
            stale_epochs: 0,
        }
    }

    /// Feed one epoch's validation loss. Returns true when it improved on the
    /// best loss, which also resets the stale counter.
    pub fn observe(&mut self, val_loss: f64) -> bool {
        if val_loss < self.best_loss - self.min_delta {
            self.best_loss = val_loss;
            self.stale_epochs = 0;
            true
        } else {
            self.stale_epochs += 1;
            false
        }
    }

    pub fn should_stop(&self) -> bool {
        self.stale_epochs >= self.patience
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn stale_epochs(&self) -> usize {
        self.stale_epochs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_always_improves() {
        let mut stopper = EarlyStopping::new(2, 0.001);
        assert!(stopper.observe(123.456));
        assert_eq!(stopper.best_loss(), 123.456);
        assert!(!stopper.should_stop());
    }

    #[test]
    fn test_improvement_must_beat_min_delta() {
        let mut stopper = EarlyStopping::new(5, 0.001);
        assert!(stopper.observe(1.0));
        // Exactly best - min_delta is not an improvement.
        assert!(!stopper.observe(0.999));
        assert_eq!(stopper.stale_epochs(), 1);
        assert!(stopper.observe(0.99));
        assert_eq!(stopper.best_loss(), 0.99);
    }

    #[test]
    fn test_improvement_resets_stale_counter() {
        let mut stopper = EarlyStopping::new(3, 0.001);
        stopper.observe(1.0);
        stopper.observe(1.2);
        stopper.observe(1.1);
        assert_eq!(stopper.stale_epochs(), 2);
        assert!(stopper.observe(0.5));
        assert_eq!(stopper.stale_epochs(), 0);
    }

    #[test]
    fn test_stops_after_patience_stale_epochs() {
        let mut stopper = EarlyStopping::new(2, 0.0);
        stopper.observe(1.0);
        stopper.observe(1.0);
        assert!(!stopper.should_stop());
        stopper.observe(1.0);
        assert!(stopper.should_stop());
    }
}
