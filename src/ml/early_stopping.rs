// ============================================================
// Layer 5 — Early Stopping
// ============================================================
// Tracks the best validation loss seen so far and how many
// epochs have passed without reaching it again.
//
//   before an epoch:  stop when wait ≥ patience
//   after an epoch:   val_loss ≤ best → save, best = val_loss, wait = 0
//                     otherwise       → wait += 1

use anyhow::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    pub patience:   usize,
    pub best:       f64,
    pub best_epoch: Option<usize>,
    pub wait:       usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best: f64::INFINITY, best_epoch: None, wait: 0 }
    }

    pub fn should_stop(&self) -> bool {
        self.wait >= self.patience
    }

    /// Records one epoch's validation loss, calling `save` on improvement.
    /// Returns whether the epoch improved.
    pub fn observe<F>(&mut self, epoch: usize, val_loss: f64, save: F) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        if val_loss <= self.best {
            tracing::info!(
                "val loss decreased from {:.4} to {:.4}, saving model",
                self.best,
                val_loss
            );
            save()?;
            self.best       = val_loss;
            self.best_epoch = Some(epoch);
            self.wait       = 0;
            Ok(true)
        } else {
            self.wait += 1;
            Ok(false)
        }
    }
}
