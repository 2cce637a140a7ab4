//! # trellis-core — hyperparameter sweeps for image classifiers
//!
//! This crate expands a typed hyperparameter grid into resolved
//! configurations and drives one training run per configuration: fit over
//! directory-backed data feeds, predict, write evaluation reports into a
//! per-run scratch directory, and record the run in a local experiment
//! tracker.
//!
//! The model behind each run is pluggable via the [`model::ModelFactory`]
//! seam; a built-in shallow softmax classifier exercises the whole
//! pipeline out of the box.

// Foundation
pub mod config;
pub mod error;
pub mod persistence;

// Grid expansion
pub mod grid;

// Data pipeline
pub mod data;

// Models & training
pub mod model;
pub mod training;

// Evaluation reports
pub mod report;

// Tracking & orchestration
pub mod sweep;
pub mod tracking;

// Re-exports
pub use config::{ColorMode, LabelEncoding, SweepFile, SweepSettings, load_sweep_file};
pub use error::SweepError;
pub use grid::{CallbackSpec, InputShape, OptimizerKind, RunConfig, SearchSpace};
pub use model::{Classifier, ModelFactory, ShallowNetFactory};
pub use sweep::{ScratchDir, SweepRunner, SweepSummary};
pub use tracking::{ExperimentTracker, TrackedRun};
pub use training::result::RunResult;
