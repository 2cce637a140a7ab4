//! Model factory seam and the built-in shallow softmax classifier.
//!
//! The sweep engine only sees the [`Classifier`] and [`ModelFactory`]
//! traits; any architecture can be plugged in per configuration. The
//! built-in [`ShallowNet`] is a single dense softmax layer over flattened
//! pixels, enough to exercise the full fit/predict/report pipeline.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::feed::ImageBatch;
use crate::error::SweepError;
use crate::grid::{OptimizerKind, RunConfig};

/// Fit statistics for one batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchStats {
    pub loss_sum: f64,
    pub correct: usize,
    pub samples: usize,
}

/// A trainable multiclass classifier.
pub trait Classifier: Send {
    /// Consume one batch, updating parameters.
    fn train_batch(&mut self, batch: &ImageBatch) -> Result<BatchStats, SweepError>;

    /// Predicted class probabilities, one row per sample.
    fn predict_batch(&self, batch: &ImageBatch) -> Result<Vec<Vec<f32>>, SweepError>;
}

/// Builds a compiled classifier for one resolved configuration.
pub trait ModelFactory: Send + Sync {
    fn build(&self, config: &RunConfig) -> Result<Box<dyn Classifier>, SweepError>;
}

/// Factory for the built-in shallow softmax classifier.
#[derive(Debug, Clone)]
pub struct ShallowNetFactory {
    seed: u64,
}

impl ShallowNetFactory {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl ModelFactory for ShallowNetFactory {
    fn build(&self, config: &RunConfig) -> Result<Box<dyn Classifier>, SweepError> {
        Ok(Box::new(ShallowNet::new(config, self.seed)?))
    }
}

/// Single dense softmax layer over flattened pixels.
pub struct ShallowNet {
    /// Weights row-major `[num_classes][dim]`, then `num_classes` biases.
    params: Vec<f32>,
    dim: usize,
    num_classes: usize,
    optimizer: OptimizerState,
}

impl ShallowNet {
    pub fn new(config: &RunConfig, seed: u64) -> Result<Self, SweepError> {
        let dim = config.input_shape.pixel_count();
        if dim == 0 {
            return Err(SweepError::model("input shape has zero pixels"));
        }
        if config.num_classes == 0 {
            return Err(SweepError::model("class count must be positive"));
        }

        let param_len = config.num_classes * dim + config.num_classes;
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = (6.0 / (dim + config.num_classes) as f32).sqrt();
        let mut params = vec![0.0; param_len];
        for w in params.iter_mut().take(config.num_classes * dim) {
            *w = rng.gen_range(-scale..scale);
        }

        Ok(Self {
            params,
            dim,
            num_classes: config.num_classes,
            optimizer: OptimizerState::new(&config.optimizer, param_len),
        })
    }

    fn forward(&self, pixels: &[f32]) -> Vec<f32> {
        let bias_offset = self.num_classes * self.dim;
        let mut logits = vec![0.0f32; self.num_classes];
        for (class, logit) in logits.iter_mut().enumerate() {
            let row = &self.params[class * self.dim..(class + 1) * self.dim];
            let mut acc = self.params[bias_offset + class];
            for (w, x) in row.iter().zip(pixels) {
                acc += w * x;
            }
            *logit = acc;
        }
        softmax(&logits)
    }

    fn check_batch(&self, batch: &ImageBatch) -> Result<(), SweepError> {
        if batch.sample_count == 0 {
            return Err(SweepError::model("empty batch"));
        }
        if batch.pixels.len() != batch.sample_count * self.dim {
            return Err(SweepError::model(format!(
                "configured input shape expects {} values per sample, batch carries {}",
                self.dim,
                batch.pixels.len() / batch.sample_count
            )));
        }
        Ok(())
    }
}

impl Classifier for ShallowNet {
    fn train_batch(&mut self, batch: &ImageBatch) -> Result<BatchStats, SweepError> {
        self.check_batch(batch)?;
        let truths = batch.labels.class_indices();
        if let Some(&bad) = truths.iter().find(|&&c| c >= self.num_classes) {
            return Err(SweepError::model(format!(
                "label {bad} out of range for {} classes",
                self.num_classes
            )));
        }

        let n = batch.sample_count;
        let bias_offset = self.num_classes * self.dim;
        let mut grads = vec![0.0f32; self.params.len()];
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;

        for (i, &truth) in truths.iter().enumerate() {
            let pixels = &batch.pixels[i * self.dim..(i + 1) * self.dim];
            let probs = self.forward(pixels);
            loss_sum += -f64::from(probs[truth].max(1e-12)).ln();
            if argmax(&probs) == truth {
                correct += 1;
            }
            for class in 0..self.num_classes {
                let delta = (probs[class] - if class == truth { 1.0 } else { 0.0 }) / n as f32;
                let row = &mut grads[class * self.dim..(class + 1) * self.dim];
                for (g, x) in row.iter_mut().zip(pixels) {
                    *g += delta * x;
                }
                grads[bias_offset + class] += delta;
            }
        }

        self.optimizer.apply(&mut self.params, &grads);

        Ok(BatchStats {
            loss_sum,
            correct,
            samples: n,
        })
    }

    fn predict_batch(&self, batch: &ImageBatch) -> Result<Vec<Vec<f32>>, SweepError> {
        self.check_batch(batch)?;
        Ok((0..batch.sample_count)
            .map(|i| self.forward(&batch.pixels[i * self.dim..(i + 1) * self.dim]))
            .collect())
    }
}

/// Index of the largest probability.
pub fn argmax(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Per-parameter optimizer state for the selected update rule.
enum OptimizerState {
    Sgd {
        lr: f32,
        momentum: f32,
        velocity: Vec<f32>,
    },
    Adam {
        lr: f32,
        beta1: f32,
        beta2: f32,
        eps: f32,
        step: u64,
        m: Vec<f32>,
        v: Vec<f32>,
    },
    Adadelta {
        lr: f32,
        rho: f32,
        eps: f32,
        acc_grad: Vec<f32>,
        acc_update: Vec<f32>,
    },
}

impl OptimizerState {
    fn new(kind: &OptimizerKind, param_len: usize) -> Self {
        match *kind {
            OptimizerKind::Sgd { lr, momentum } => OptimizerState::Sgd {
                lr,
                momentum,
                velocity: vec![0.0; param_len],
            },
            OptimizerKind::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => OptimizerState::Adam {
                lr,
                beta1,
                beta2,
                eps,
                step: 0,
                m: vec![0.0; param_len],
                v: vec![0.0; param_len],
            },
            OptimizerKind::Adadelta { lr, rho, eps } => OptimizerState::Adadelta {
                lr,
                rho,
                eps,
                acc_grad: vec![0.0; param_len],
                acc_update: vec![0.0; param_len],
            },
        }
    }

    fn apply(&mut self, params: &mut [f32], grads: &[f32]) {
        match self {
            OptimizerState::Sgd {
                lr,
                momentum,
                velocity,
            } => {
                for ((p, &g), v) in params.iter_mut().zip(grads).zip(velocity.iter_mut()) {
                    *v = *momentum * *v + g;
                    *p -= *lr * *v;
                }
            }
            OptimizerState::Adam {
                lr,
                beta1,
                beta2,
                eps,
                step,
                m,
                v,
            } => {
                *step += 1;
                let bias1 = 1.0 - beta1.powi(*step as i32);
                let bias2 = 1.0 - beta2.powi(*step as i32);
                for ((p, &g), (mi, vi)) in params
                    .iter_mut()
                    .zip(grads)
                    .zip(m.iter_mut().zip(v.iter_mut()))
                {
                    *mi = *beta1 * *mi + (1.0 - *beta1) * g;
                    *vi = *beta2 * *vi + (1.0 - *beta2) * g * g;
                    let m_hat = *mi / bias1;
                    let v_hat = *vi / bias2;
                    *p -= *lr * m_hat / (v_hat.sqrt() + *eps);
                }
            }
            OptimizerState::Adadelta {
                lr,
                rho,
                eps,
                acc_grad,
                acc_update,
            } => {
                for ((p, &g), (ag, au)) in params
                    .iter_mut()
                    .zip(grads)
                    .zip(acc_grad.iter_mut().zip(acc_update.iter_mut()))
                {
                    *ag = *rho * *ag + (1.0 - *rho) * g * g;
                    let update = -((*au + *eps).sqrt() / (*ag + *eps).sqrt()) * g;
                    *au = *rho * *au + (1.0 - *rho) * update * update;
                    *p += *lr * update;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feed::LabelBatch;
    use crate::grid::{CallbackSpec, InputShape};

    fn config(optimizer: OptimizerKind) -> RunConfig {
        RunConfig {
            input_shape: InputShape {
                height: 1,
                width: 2,
                channels: 1,
            },
            num_classes: 2,
            optimizer,
            epochs: 1,
            callbacks: vec![CallbackSpec::EpochLog],
        }
    }

    /// Two trivially separable samples: class 0 lights the first pixel,
    /// class 1 the second.
    fn separable_batch() -> ImageBatch {
        ImageBatch {
            pixels: vec![1.0, 0.0, 0.0, 1.0],
            sample_count: 2,
            labels: LabelBatch::Sparse(vec![0, 1]),
            sample_indices: vec![0, 1],
        }
    }

    #[test]
    fn test_rejects_zero_classes() {
        let mut cfg = config(OptimizerKind::sgd(0.1));
        cfg.num_classes = 0;
        assert!(matches!(
            ShallowNet::new(&cfg, 42),
            Err(SweepError::Model(_))
        ));
    }

    #[test]
    fn test_rejects_mismatched_batch() {
        let mut model = ShallowNet::new(&config(OptimizerKind::sgd(0.1)), 42).unwrap();
        let batch = ImageBatch {
            pixels: vec![1.0; 6],
            sample_count: 2,
            labels: LabelBatch::Sparse(vec![0, 1]),
            sample_indices: vec![0, 1],
        };
        assert!(matches!(
            model.train_batch(&batch),
            Err(SweepError::Model(_))
        ));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = ShallowNet::new(&config(OptimizerKind::adam(0.001)), 42).unwrap();
        let rows = model.predict_batch(&separable_batch()).unwrap();
        for row in rows {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_training_reduces_loss() {
        for optimizer in [
            OptimizerKind::sgd(0.5),
            OptimizerKind::adam(0.05),
            OptimizerKind::adadelta(),
        ] {
            let mut model = ShallowNet::new(&config(optimizer), 42).unwrap();
            let batch = separable_batch();
            let first = model.train_batch(&batch).unwrap();
            let mut last = first;
            for _ in 0..300 {
                last = model.train_batch(&batch).unwrap();
            }
            assert!(
                last.loss_sum < first.loss_sum,
                "{} did not reduce loss ({} -> {})",
                optimizer.name(),
                first.loss_sum,
                last.loss_sum
            );
            assert_eq!(last.correct, 2);
        }
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        let cfg = config(OptimizerKind::sgd(0.1));
        let a = ShallowNet::new(&cfg, 7).unwrap();
        let b = ShallowNet::new(&cfg, 7).unwrap();
        let batch = separable_batch();
        assert_eq!(
            a.predict_batch(&batch).unwrap(),
            b.predict_batch(&batch).unwrap()
        );
    }

    #[test]
    fn test_label_out_of_range() {
        let mut model = ShallowNet::new(&config(OptimizerKind::sgd(0.1)), 42).unwrap();
        let batch = ImageBatch {
            pixels: vec![1.0, 0.0],
            sample_count: 1,
            labels: LabelBatch::Sparse(vec![5]),
            sample_indices: vec![0],
        };
        assert!(matches!(
            model.train_batch(&batch),
            Err(SweepError::Model(_))
        ));
    }
}
