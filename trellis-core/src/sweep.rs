//! Orchestration: one sequential training run per grid point.
//!
//! For each configuration: allocate a scratch directory, build and fit the
//! classifier, predict, write reports, log to the tracker, release the
//! scratch directory. Runs are strictly sequential; the three feeds are
//! shared read-only and re-driven from the start each run. The first error
//! aborts the whole sweep; previously logged runs stay in the registry.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::SweepSettings;
use crate::data::feed::{DataFeed, FeedOptions};
use crate::error::SweepError;
use crate::grid::{RunConfig, SearchSpace};
use crate::model::ModelFactory;
use crate::report;
use crate::tracking::{ExperimentTracker, TrackedRun};
use crate::training::trainer::Trainer;

/// A uniquely-named scratch directory with the report layout pre-created.
///
/// The directory is removed when the value is dropped, on every exit path;
/// [`ScratchDir::keep`] disarms cleanup and leaves it on disk.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn create() -> Result<Self, SweepError> {
        let dir = tempfile::Builder::new().prefix("trellis-run-").tempdir()?;
        std::fs::create_dir_all(dir.path().join("images"))?;
        std::fs::create_dir_all(dir.path().join("text").join("probs"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    pub fn text_dir(&self) -> PathBuf {
        self.dir.path().join("text")
    }

    pub fn probs_dir(&self) -> PathBuf {
        self.dir.path().join("text").join("probs")
    }

    /// Disarm cleanup and return the directory's path.
    pub fn keep(self) -> PathBuf {
        self.dir.into_path()
    }
}

/// Everything a finished sweep reports back.
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub runs: Vec<TrackedRun>,
}

/// Sequentially executes every configuration of a search space.
pub struct SweepRunner<F: ModelFactory> {
    settings: SweepSettings,
    factory: F,
    tracker: ExperimentTracker,
}

impl<F: ModelFactory> SweepRunner<F> {
    pub fn new(settings: SweepSettings, factory: F) -> Self {
        let tracker = ExperimentTracker::new(settings.tracking_root.clone());
        Self {
            settings,
            factory,
            tracker,
        }
    }

    pub fn tracker(&self) -> &ExperimentTracker {
        &self.tracker
    }

    /// Run the full sweep.
    ///
    /// The three feeds are constructed up front, so a missing or empty split
    /// aborts before any run starts and before anything is logged.
    pub fn run(&self, space: &SearchSpace) -> Result<SweepSummary, SweepError> {
        let options = FeedOptions::from_settings(&self.settings);
        let train = DataFeed::scan(&self.settings.train_dir(), options)?;
        let test = DataFeed::scan(&self.settings.test_dir(), options)?;
        let val = DataFeed::scan(&self.settings.val_dir(), options)?;

        let space = space.resolved(&self.settings, train.num_classes());
        let total = space.cardinality();
        tracing::info!(
            sweep = %self.settings.sweep_name,
            configurations = total,
            classes = train.num_classes(),
            "expanded search space"
        );

        let trainer = Trainer::new(&self.factory, &train, &test, &val);
        let mut runs = Vec::with_capacity(total);
        for (index, config) in space.configurations().enumerate() {
            tracing::info!(
                run = index + 1,
                total,
                optimizer = config.optimizer.name(),
                epochs = config.epochs,
                "starting run"
            );
            let scratch = ScratchDir::create()?;
            match self.execute(&trainer, &config, &scratch) {
                Ok(run) => runs.push(run),
                Err(e) => {
                    if self.settings.keep_scratch_on_failure {
                        let kept = scratch.keep();
                        tracing::error!(
                            scratch = %kept.display(),
                            "run failed; scratch directory preserved"
                        );
                    }
                    return Err(e);
                }
            }
        }

        Ok(SweepSummary { runs })
    }

    fn execute(
        &self,
        trainer: &Trainer<'_, F>,
        config: &RunConfig,
        scratch: &ScratchDir,
    ) -> Result<TrackedRun, SweepError> {
        let result = trainer.run(config, &scratch.text_dir())?;
        report::write_all(
            &result,
            &scratch.images_dir(),
            &scratch.text_dir(),
            &scratch.probs_dir(),
        )?;
        let run = self
            .tracker
            .log_run(&self.settings.sweep_name, &result, scratch.path())?;
        tracing::info!(
            id = %run.id,
            test_accuracy = run.metrics.test_accuracy,
            "run logged"
        );
        Ok(run)
    }
}
