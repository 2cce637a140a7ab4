//! Typed hyperparameter grid and its Cartesian expansion.
//!
//! Every sweepable field is enumerated explicitly with its declared type;
//! a [`SearchSpace`] holds the candidate lists and [`RunConfig`] is one
//! resolved point of the product. Expansion is lazy and deterministic:
//! field declaration order, last field varying fastest, so repeated sweeps
//! produce identically-ordered run logs.

use serde::{Deserialize, Serialize};

use crate::config::SweepSettings;

/// Input tensor shape: height, width, channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub height: u32,
    pub width: u32,
    pub channels: usize,
}

impl InputShape {
    pub fn pixel_count(&self) -> usize {
        self.height as usize * self.width as usize * self.channels
    }
}

/// Optimizer selection, one tag per supported update rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerKind {
    Adadelta {
        #[serde(default = "default_adadelta_lr")]
        lr: f32,
        #[serde(default = "default_rho")]
        rho: f32,
        #[serde(default = "default_adadelta_eps")]
        eps: f32,
    },
    Sgd {
        #[serde(default = "default_sgd_lr")]
        lr: f32,
        #[serde(default)]
        momentum: f32,
    },
    Adam {
        #[serde(default = "default_adam_lr")]
        lr: f32,
        #[serde(default = "default_beta1")]
        beta1: f32,
        #[serde(default = "default_beta2")]
        beta2: f32,
        #[serde(default = "default_adam_eps")]
        eps: f32,
    },
}

impl OptimizerKind {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Adadelta { .. } => "adadelta",
            OptimizerKind::Sgd { .. } => "sgd",
            OptimizerKind::Adam { .. } => "adam",
        }
    }

    pub fn adadelta() -> Self {
        OptimizerKind::Adadelta {
            lr: default_adadelta_lr(),
            rho: default_rho(),
            eps: default_adadelta_eps(),
        }
    }

    pub fn sgd(lr: f32) -> Self {
        OptimizerKind::Sgd { lr, momentum: 0.0 }
    }

    pub fn adam(lr: f32) -> Self {
        OptimizerKind::Adam {
            lr,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_adam_eps(),
        }
    }
}

fn default_adadelta_lr() -> f32 {
    1.0
}

fn default_rho() -> f32 {
    0.95
}

fn default_adadelta_eps() -> f32 {
    1e-6
}

fn default_sgd_lr() -> f32 {
    0.01
}

fn default_adam_lr() -> f32 {
    0.001
}

fn default_beta1() -> f32 {
    0.9
}

fn default_beta2() -> f32 {
    0.999
}

fn default_adam_eps() -> f32 {
    1e-8
}

/// Declarative training callback, instantiated per run.
///
/// Candidates in the grid are whole callback lists, so a configuration can
/// swap one set of hooks for another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackSpec {
    /// Log per-epoch metrics and append them to the run's epoch log file.
    EpochLog,
    /// Stop when validation loss stops improving.
    EarlyStopping {
        #[serde(default = "default_patience")]
        patience: usize,
        #[serde(default)]
        min_delta: f64,
    },
}

fn default_patience() -> usize {
    5
}

/// Candidate lists for every sweepable field.
///
/// The Cartesian product over all fields is the sweep. An empty candidate
/// list makes the product empty: zero configurations, zero runs, not an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Derived from the sweep settings when left empty.
    #[serde(default)]
    pub input_shape: Vec<InputShape>,
    /// Derived from the training feed when left empty.
    #[serde(default)]
    pub num_classes: Vec<usize>,
    #[serde(default)]
    pub optimizer: Vec<OptimizerKind>,
    #[serde(default)]
    pub epochs: Vec<usize>,
    #[serde(default = "default_callbacks")]
    pub callbacks: Vec<Vec<CallbackSpec>>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            input_shape: Vec::new(),
            num_classes: Vec::new(),
            optimizer: Vec::new(),
            epochs: Vec::new(),
            callbacks: default_callbacks(),
        }
    }
}

fn default_callbacks() -> Vec<Vec<CallbackSpec>> {
    vec![vec![CallbackSpec::EpochLog]]
}

/// One fully-resolved point of the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_shape: InputShape,
    pub num_classes: usize,
    pub optimizer: OptimizerKind,
    pub epochs: usize,
    pub callbacks: Vec<CallbackSpec>,
}

impl SearchSpace {
    /// Number of configurations in the full product.
    pub fn cardinality(&self) -> usize {
        self.input_shape.len()
            * self.num_classes.len()
            * self.optimizer.len()
            * self.epochs.len()
            * self.callbacks.len()
    }

    /// Lazily iterate the full Cartesian product.
    ///
    /// Order is deterministic: field declaration order, candidate order
    /// within each field, last field varying fastest. Nothing is skipped or
    /// deduplicated.
    pub fn configurations(&self) -> Configurations<'_> {
        Configurations {
            space: self,
            next: 0,
            total: self.cardinality(),
        }
    }

    /// Fill the two derivable fields the way the sweep wiring derives them:
    /// input shape from the sweep-wide image settings, class count from the
    /// training feed. Explicit candidates are left untouched.
    pub fn resolved(&self, settings: &SweepSettings, num_classes: usize) -> SearchSpace {
        let mut space = self.clone();
        if space.input_shape.is_empty() {
            space.input_shape = vec![InputShape {
                height: settings.image_height,
                width: settings.image_width,
                channels: settings.color_mode.channels(),
            }];
        }
        if space.num_classes.is_empty() {
            space.num_classes = vec![num_classes];
        }
        space
    }
}

/// Lazy iterator over a search space's Cartesian product.
pub struct Configurations<'a> {
    space: &'a SearchSpace,
    next: usize,
    total: usize,
}

impl Iterator for Configurations<'_> {
    type Item = RunConfig;

    fn next(&mut self) -> Option<RunConfig> {
        if self.next >= self.total {
            return None;
        }
        let s = self.space;
        // Mixed-radix decomposition of the flat index, last field fastest.
        let mut idx = self.next;
        self.next += 1;
        let cb = idx % s.callbacks.len();
        idx /= s.callbacks.len();
        let ep = idx % s.epochs.len();
        idx /= s.epochs.len();
        let op = idx % s.optimizer.len();
        idx /= s.optimizer.len();
        let nc = idx % s.num_classes.len();
        idx /= s.num_classes.len();
        let sh = idx;
        Some(RunConfig {
            input_shape: s.input_shape[sh],
            num_classes: s.num_classes[nc],
            optimizer: s.optimizer[op],
            epochs: s.epochs[ep],
            callbacks: s.callbacks[cb].clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Configurations<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shape() -> InputShape {
        InputShape {
            height: 64,
            width: 64,
            channels: 3,
        }
    }

    fn two_by_one_space() -> SearchSpace {
        SearchSpace {
            input_shape: vec![shape()],
            num_classes: vec![4],
            optimizer: vec![OptimizerKind::adadelta()],
            epochs: vec![2, 5],
            callbacks: vec![vec![CallbackSpec::EpochLog]],
        }
    }

    #[test]
    fn test_cardinality_is_product() {
        let space = SearchSpace {
            input_shape: vec![shape(); 2],
            num_classes: vec![2, 3, 4],
            optimizer: vec![OptimizerKind::adadelta(), OptimizerKind::sgd(0.01)],
            epochs: vec![1, 2],
            callbacks: vec![vec![CallbackSpec::EpochLog]],
        };
        assert_eq!(space.cardinality(), 2 * 3 * 2 * 2);
        assert_eq!(space.configurations().count(), 24);
    }

    #[test]
    fn test_epochs_vary_in_declared_order() {
        let space = two_by_one_space();
        let configs: Vec<RunConfig> = space.configurations().collect();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].epochs, 2);
        assert_eq!(configs[1].epochs, 5);
        assert_eq!(configs[0].optimizer.name(), "adadelta");
    }

    #[test]
    fn test_empty_candidate_list_yields_empty_product() {
        let mut space = two_by_one_space();
        space.optimizer.clear();
        assert_eq!(space.cardinality(), 0);
        assert_eq!(space.configurations().count(), 0);
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let space = SearchSpace {
            input_shape: vec![shape()],
            num_classes: vec![2, 5],
            optimizer: vec![OptimizerKind::sgd(0.1), OptimizerKind::adam(0.001)],
            epochs: vec![1, 2, 3],
            callbacks: vec![vec![CallbackSpec::EpochLog], Vec::new()],
        };
        let first: Vec<RunConfig> = space.configurations().collect();
        let second: Vec<RunConfig> = space.configurations().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_last_field_varies_fastest() {
        let space = SearchSpace {
            input_shape: vec![shape()],
            num_classes: vec![2],
            optimizer: vec![OptimizerKind::sgd(0.1), OptimizerKind::adam(0.001)],
            epochs: vec![1, 2],
            callbacks: vec![vec![CallbackSpec::EpochLog]],
        };
        let configs: Vec<RunConfig> = space.configurations().collect();
        let pairs: Vec<(&'static str, usize)> = configs
            .iter()
            .map(|c| (c.optimizer.name(), c.epochs))
            .collect();
        assert_eq!(
            pairs,
            vec![("sgd", 1), ("sgd", 2), ("adam", 1), ("adam", 2)]
        );
    }

    #[test]
    fn test_size_hint_is_exact() {
        let space = two_by_one_space();
        let mut iter = space.configurations();
        assert_eq!(iter.len(), 2);
        iter.next();
        assert_eq!(iter.len(), 1);
    }

    #[test]
    fn test_resolved_fills_derivable_fields() {
        let settings = SweepSettings::default();
        let space = SearchSpace {
            optimizer: vec![OptimizerKind::adadelta()],
            epochs: vec![2],
            ..SearchSpace::default()
        };
        let resolved = space.resolved(&settings, 7);
        assert_eq!(
            resolved.input_shape,
            vec![InputShape {
                height: 64,
                width: 64,
                channels: 3
            }]
        );
        assert_eq!(resolved.num_classes, vec![7]);
        assert_eq!(resolved.cardinality(), 1);
    }

    #[test]
    fn test_resolved_keeps_explicit_candidates() {
        let settings = SweepSettings::default();
        let space = two_by_one_space();
        let resolved = space.resolved(&settings, 99);
        assert_eq!(resolved.num_classes, vec![4]);
    }

    #[test]
    fn test_optimizer_serde_tags() {
        let json = serde_json::to_string(&OptimizerKind::adadelta()).unwrap();
        assert!(json.contains("adadelta"));
        let parsed: OptimizerKind = serde_json::from_str(r#"{"type":"sgd","lr":0.5}"#).unwrap();
        assert_eq!(parsed, OptimizerKind::sgd(0.5));
    }
}
