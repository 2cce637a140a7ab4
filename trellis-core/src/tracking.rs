//! Local filesystem experiment tracking.
//!
//! Each logged run gets its own directory under the tracking root with
//! `params.json`, `metrics.json` and a copy of the scratch artifacts; a
//! `runs.json` registry is appended atomically so a sweep aborted mid-way
//! keeps every previously logged run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SweepError;
use crate::grid::RunConfig;
use crate::persistence;
use crate::training::result::RunResult;

/// Outcome recorded for a tracked run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Summary metrics logged per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub epochs_completed: usize,
    pub final_train_loss: Option<f64>,
    pub best_val_loss: Option<f64>,
    pub best_epoch: Option<usize>,
    pub test_accuracy: f64,
    pub training_secs: f64,
}

impl RunMetrics {
    pub fn from_result(result: &RunResult) -> Self {
        Self {
            epochs_completed: result.history.epochs_completed,
            final_train_loss: result.history.final_train_loss(),
            best_val_loss: result.history.best_val_loss,
            best_epoch: result.history.best_epoch,
            test_accuracy: result.test_accuracy(),
            training_secs: result.history.total_training_secs,
        }
    }
}

/// One tracked run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedRun {
    pub id: String,
    pub sweep_name: String,
    pub params: RunConfig,
    pub metrics: RunMetrics,
    pub status: RunStatus,
    /// SHA-256 over the copied artifact tree (relative paths + contents).
    pub artifacts_digest: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Records runs under a root directory.
pub struct ExperimentTracker {
    root: PathBuf,
}

impl ExperimentTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join("runs.json")
    }

    /// All tracked runs, oldest first. Missing registry means no runs yet.
    pub fn list(&self) -> Result<Vec<TrackedRun>, SweepError> {
        Ok(persistence::load_json(&self.registry_path())?.unwrap_or_default())
    }

    /// Log one completed run: copy its artifacts, write params and metrics,
    /// append to the registry.
    pub fn log_run(
        &self,
        sweep_name: &str,
        result: &RunResult,
        artifacts_dir: &Path,
    ) -> Result<TrackedRun, SweepError> {
        let id = uuid::Uuid::new_v4().to_string();
        let run_dir = self.root.join(&id);
        std::fs::create_dir_all(&run_dir)?;

        persistence::atomic_write_json(&run_dir.join("params.json"), &result.config)?;
        let metrics = RunMetrics::from_result(result);
        persistence::atomic_write_json(&run_dir.join("metrics.json"), &metrics)?;
        let digest = copy_artifacts(artifacts_dir, &run_dir.join("artifacts"))?;

        let run = TrackedRun {
            id,
            sweep_name: sweep_name.to_string(),
            params: result.config.clone(),
            metrics,
            status: RunStatus::Completed,
            artifacts_digest: Some(digest),
            created_at: Utc::now(),
        };

        let mut runs = self.list()?;
        runs.push(run.clone());
        persistence::atomic_write_json(&self.registry_path(), &runs)?;

        tracing::debug!(id = %run.id, "run appended to registry");
        Ok(run)
    }
}

/// Copy the artifact tree and digest its contents (relative path + bytes,
/// in sorted walk order so the digest is stable).
fn copy_artifacts(src: &Path, dst: &Path) -> Result<String, SweepError> {
    let mut hasher = Sha256::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| SweepError::tracking(format!("artifact walk: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| SweepError::tracking(format!("artifact path: {e}")))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let bytes = std::fs::read(entry.path())?;
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update(&bytes);
            std::fs::write(&target, &bytes)?;
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}
