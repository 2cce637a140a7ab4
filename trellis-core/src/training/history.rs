//! Per-run training history.

use serde::{Deserialize, Serialize};

/// Epoch-by-epoch metrics for one training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunHistory {
    pub epochs_completed: usize,
    pub train_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
    /// 1-based epoch with the lowest validation loss.
    pub best_epoch: Option<usize>,
    pub best_val_loss: Option<f64>,
    pub total_training_secs: f64,
}

impl RunHistory {
    pub fn record_epoch(
        &mut self,
        train_loss: f64,
        train_accuracy: f64,
        val_loss: f64,
        val_accuracy: f64,
    ) {
        self.train_loss.push(train_loss);
        self.train_accuracy.push(train_accuracy);
        self.val_loss.push(val_loss);
        self.val_accuracy.push(val_accuracy);
        self.epochs_completed += 1;

        if self.best_val_loss.is_none() || val_loss < self.best_val_loss.unwrap_or(f64::MAX) {
            self.best_val_loss = Some(val_loss);
            self.best_epoch = Some(self.epochs_completed);
        }
    }

    pub fn final_train_loss(&self) -> Option<f64> {
        self.train_loss.last().copied()
    }

    pub fn final_val_loss(&self) -> Option<f64> {
        self.val_loss.last().copied()
    }
}
