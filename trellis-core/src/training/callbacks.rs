//! Training callbacks, instantiated per run from declarative specs.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::grid::CallbackSpec;
use crate::training::history::RunHistory;

/// Action a callback can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

/// Trait for training callbacks.
pub trait TrainingCallback: Send {
    /// Called at the end of each epoch with the 0-based epoch number and the
    /// history so far.
    fn on_epoch_end(&mut self, epoch: usize, history: &RunHistory) -> CallbackAction;
}

/// Instantiate a run's callbacks from its specs.
///
/// `text_dir` is the run's scratch text directory; file-writing callbacks
/// place their output there so it is picked up with the run's artifacts.
pub fn build_callbacks(specs: &[CallbackSpec], text_dir: &Path) -> Vec<Box<dyn TrainingCallback>> {
    specs
        .iter()
        .map(|spec| -> Box<dyn TrainingCallback> {
            match spec {
                CallbackSpec::EpochLog => {
                    Box::new(EpochLogCallback::new(text_dir.join("epochs.jsonl")))
                }
                CallbackSpec::EarlyStopping { patience, min_delta } => {
                    Box::new(EarlyStoppingCallback::new(*patience, *min_delta))
                }
            }
        })
        .collect()
}

/// Logs epoch metrics and appends them as JSON lines to the run's epoch log.
pub struct EpochLogCallback {
    path: PathBuf,
}

impl EpochLogCallback {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TrainingCallback for EpochLogCallback {
    fn on_epoch_end(&mut self, epoch: usize, history: &RunHistory) -> CallbackAction {
        let line = serde_json::json!({
            "epoch": epoch + 1,
            "train_loss": history.final_train_loss(),
            "train_accuracy": history.train_accuracy.last(),
            "val_loss": history.final_val_loss(),
            "val_accuracy": history.val_accuracy.last(),
        });
        tracing::info!(
            epoch = epoch + 1,
            train_loss = history.final_train_loss(),
            val_loss = history.final_val_loss(),
            "epoch complete"
        );
        let appended = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = appended {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append epoch log");
        }
        CallbackAction::Continue
    }
}

/// Stops training when validation loss stops improving.
pub struct EarlyStoppingCallback {
    patience: usize,
    min_delta: f64,
    counter: usize,
    best_loss: Option<f64>,
}

impl EarlyStoppingCallback {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            patience,
            min_delta,
            counter: 0,
            best_loss: None,
        }
    }
}

impl TrainingCallback for EarlyStoppingCallback {
    fn on_epoch_end(&mut self, _epoch: usize, history: &RunHistory) -> CallbackAction {
        let loss = history
            .final_val_loss()
            .or_else(|| history.final_train_loss())
            .unwrap_or(f64::MAX);
        match self.best_loss {
            None => {
                self.best_loss = Some(loss);
                CallbackAction::Continue
            }
            Some(best) => {
                if loss < best - self.min_delta {
                    self.best_loss = Some(loss);
                    self.counter = 0;
                    CallbackAction::Continue
                } else {
                    self.counter += 1;
                    if self.counter >= self.patience {
                        CallbackAction::Stop
                    } else {
                        CallbackAction::Continue
                    }
                }
            }
        }
    }
}
