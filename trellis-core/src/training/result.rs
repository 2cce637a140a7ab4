//! The value object one training run produces.

use serde::{Deserialize, Serialize};

use crate::grid::RunConfig;
use crate::training::history::RunHistory;

/// Everything one run yields: history, predictions and their context.
///
/// Returned by value from the trainer; consumed by the reporting stage and
/// the tracker within the same loop iteration, never persisted beyond the
/// tracker's log call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub config: RunConfig,
    pub history: RunHistory,
    pub class_names: Vec<String>,
    /// Relative test-sample paths, aligned with the prediction vectors.
    pub test_filenames: Vec<String>,
    pub y_true: Vec<usize>,
    pub y_pred: Vec<usize>,
    /// Predicted class probabilities, one row per test sample.
    pub probabilities: Vec<Vec<f32>>,
}

impl RunResult {
    /// Fraction of test samples predicted correctly.
    pub fn test_accuracy(&self) -> f64 {
        if self.y_true.is_empty() {
            return 0.0;
        }
        let correct = self
            .y_true
            .iter()
            .zip(&self.y_pred)
            .filter(|(t, p)| t == p)
            .count();
        correct as f64 / self.y_true.len() as f64
    }
}
