//! Sweep-wide configuration.
//!
//! The constants the data feeds and the orchestration loop share (image
//! geometry, batching, the shuffle seed, directory roots) live in an
//! explicit [`SweepSettings`] value that is passed in, never read from
//! ambient state. Loading is layered: serde defaults -> user config ->
//! workspace `trellis.toml` -> explicit file -> `TRELLIS_` environment
//! variables.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SweepError;
use crate::grid::SearchSpace;

/// Color mode decoded images are converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Rgb,
    Grayscale,
}

impl ColorMode {
    pub fn channels(&self) -> usize {
        match self {
            ColorMode::Rgb => 3,
            ColorMode::Grayscale => 1,
        }
    }
}

/// How class labels are encoded in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelEncoding {
    /// One-hot rows, one column per class.
    Categorical,
    /// Bare class indices.
    Sparse,
}

/// Settings shared by every run of a sweep. These are sweep-wide, not swept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Name recorded with every tracked run.
    #[serde(default = "default_sweep_name")]
    pub sweep_name: String,
    /// Root directory containing `train/`, `test/` and `val/` class trees.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    #[serde(default = "default_color_mode")]
    pub color_mode: ColorMode,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_label_encoding")]
    pub label_encoding: LabelEncoding,
    /// Shuffle sample order each epoch.
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Seed shared by the three feeds so batch order is reproducible.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Directory the experiment tracker writes run records into.
    #[serde(default = "default_tracking_root")]
    pub tracking_root: PathBuf,
    /// Preserve a failing run's scratch directory for debugging instead of
    /// removing it.
    #[serde(default)]
    pub keep_scratch_on_failure: bool,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            sweep_name: default_sweep_name(),
            data_root: default_data_root(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            color_mode: default_color_mode(),
            batch_size: default_batch_size(),
            label_encoding: default_label_encoding(),
            shuffle: default_shuffle(),
            seed: default_seed(),
            tracking_root: default_tracking_root(),
            keep_scratch_on_failure: false,
        }
    }
}

fn default_sweep_name() -> String {
    "trellis-sweep".to_string()
}

fn default_data_root() -> PathBuf {
    PathBuf::from("dataset")
}

fn default_image_width() -> u32 {
    64
}

fn default_image_height() -> u32 {
    64
}

fn default_color_mode() -> ColorMode {
    ColorMode::Rgb
}

fn default_batch_size() -> usize {
    32
}

fn default_label_encoding() -> LabelEncoding {
    LabelEncoding::Categorical
}

fn default_shuffle() -> bool {
    true
}

fn default_seed() -> u64 {
    42
}

fn default_tracking_root() -> PathBuf {
    PathBuf::from(".trellis/runs")
}

impl SweepSettings {
    pub fn train_dir(&self) -> PathBuf {
        self.data_root.join("train")
    }

    pub fn test_dir(&self) -> PathBuf {
        self.data_root.join("test")
    }

    pub fn val_dir(&self) -> PathBuf {
        self.data_root.join("val")
    }
}

/// A sweep file: the shared settings plus the search space to expand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepFile {
    #[serde(default)]
    pub settings: SweepSettings,
    #[serde(default)]
    pub space: SearchSpace,
}

/// Load a sweep file with layered overrides.
///
/// Order: defaults, then `sweep.toml` in the user config directory, then
/// `trellis.toml` in the working directory (skipped when an explicit file is
/// given), then the explicit file, then `TRELLIS_`-prefixed environment
/// variables (`__` separates nesting, e.g. `TRELLIS_SETTINGS__BATCH_SIZE`).
pub fn load_sweep_file(explicit: Option<&Path>) -> Result<SweepFile, SweepError> {
    let mut figment = Figment::from(Serialized::defaults(SweepFile::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "trellis", "trellis") {
        let user_config = dirs.config_dir().join("sweep.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    let workspace_config = Path::new("trellis.toml");
    if explicit.is_none() && workspace_config.exists() {
        figment = figment.merge(Toml::file(workspace_config));
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(SweepError::config(format!(
                "sweep file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("TRELLIS_").split("__"));
    figment.extract().map_err(|e| SweepError::config(e.to_string()))
}
