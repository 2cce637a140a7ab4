//! Drives fit -> validate -> predict for one configuration.

use std::path::Path;
use std::time::Instant;

use crate::data::feed::DataFeed;
use crate::error::SweepError;
use crate::grid::RunConfig;
use crate::model::{Classifier, ModelFactory, argmax};
use crate::training::callbacks::{CallbackAction, build_callbacks};
use crate::training::history::RunHistory;
use crate::training::result::RunResult;

/// Aggregated loss/accuracy over one pass of a feed.
#[derive(Debug, Clone, Copy)]
struct PassStats {
    loss: f64,
    accuracy: f64,
}

/// Trains and evaluates one model per configuration over shared feeds.
///
/// The feeds are borrowed read-only and re-driven from the start for every
/// run; the trainer holds no cross-run state.
pub struct Trainer<'a, F: ModelFactory> {
    factory: &'a F,
    train: &'a DataFeed,
    test: &'a DataFeed,
    val: &'a DataFeed,
}

impl<'a, F: ModelFactory> Trainer<'a, F> {
    pub fn new(factory: &'a F, train: &'a DataFeed, test: &'a DataFeed, val: &'a DataFeed) -> Self {
        Self {
            factory,
            train,
            test,
            val,
        }
    }

    /// Run one configuration to completion and return its result.
    ///
    /// `text_dir` is the run's scratch text directory, handed to
    /// file-writing callbacks.
    pub fn run(&self, config: &RunConfig, text_dir: &Path) -> Result<RunResult, SweepError> {
        let started = Instant::now();
        let mut model = self.factory.build(config)?;
        let mut callbacks = build_callbacks(&config.callbacks, text_dir);
        let mut history = RunHistory::default();

        'epochs: for epoch in 0..config.epochs {
            let train_stats = self.fit_epoch(model.as_mut(), epoch)?;
            let val_stats = self.evaluate(model.as_ref(), self.val, epoch)?;
            history.record_epoch(
                train_stats.loss,
                train_stats.accuracy,
                val_stats.loss,
                val_stats.accuracy,
            );
            for callback in callbacks.iter_mut() {
                if callback.on_epoch_end(epoch, &history) == CallbackAction::Stop {
                    tracing::info!(epoch = epoch + 1, "callback requested early stop");
                    break 'epochs;
                }
            }
        }
        history.total_training_secs = started.elapsed().as_secs_f64();

        let (y_true, y_pred, probabilities) = self.predict(model.as_ref())?;

        Ok(RunResult {
            config: config.clone(),
            history,
            class_names: self.test.class_names().to_vec(),
            test_filenames: self.test.filenames(),
            y_true,
            y_pred,
            probabilities,
        })
    }

    fn fit_epoch(&self, model: &mut dyn Classifier, epoch: usize) -> Result<PassStats, SweepError> {
        let mut loss_sum = 0.0;
        let mut correct = 0usize;
        let mut samples = 0usize;
        for batch in self.train.epoch(epoch) {
            let batch = batch?;
            let stats = model.train_batch(&batch)?;
            loss_sum += stats.loss_sum;
            correct += stats.correct;
            samples += stats.samples;
        }
        if samples == 0 {
            return Err(SweepError::training("training feed produced no samples"));
        }
        Ok(PassStats {
            loss: loss_sum / samples as f64,
            accuracy: correct as f64 / samples as f64,
        })
    }

    fn evaluate(
        &self,
        model: &dyn Classifier,
        feed: &DataFeed,
        epoch: usize,
    ) -> Result<PassStats, SweepError> {
        let mut loss_sum = 0.0;
        let mut correct = 0usize;
        let mut samples = 0usize;
        for batch in feed.epoch(epoch) {
            let batch = batch?;
            let rows = model.predict_batch(&batch)?;
            let truths = batch.labels.class_indices();
            for (row, truth) in rows.iter().zip(truths) {
                let p = row.get(truth).copied().unwrap_or(0.0);
                loss_sum += -f64::from(p.max(1e-12)).ln();
                if argmax(row) == truth {
                    correct += 1;
                }
                samples += 1;
            }
        }
        if samples == 0 {
            return Err(SweepError::training("evaluation feed produced no samples"));
        }
        Ok(PassStats {
            loss: loss_sum / samples as f64,
            accuracy: correct as f64 / samples as f64,
        })
    }

    /// Predict the test split, scattering rows back into scan order so the
    /// vectors align with the feed's filenames.
    fn predict(
        &self,
        model: &dyn Classifier,
    ) -> Result<(Vec<usize>, Vec<usize>, Vec<Vec<f32>>), SweepError> {
        let n = self.test.len();
        let mut y_true = vec![0usize; n];
        let mut y_pred = vec![0usize; n];
        let mut probabilities = vec![Vec::new(); n];

        for batch in self.test.epoch(0) {
            let batch = batch?;
            let rows = model.predict_batch(&batch)?;
            let truths = batch.labels.class_indices();
            for ((row, &sample_index), truth) in
                rows.into_iter().zip(&batch.sample_indices).zip(truths)
            {
                y_true[sample_index] = truth;
                y_pred[sample_index] = argmax(&row);
                probabilities[sample_index] = row;
            }
        }
        Ok((y_true, y_pred, probabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColorMode, LabelEncoding};
    use crate::data::feed::FeedOptions;
    use crate::grid::{CallbackSpec, InputShape, OptimizerKind};
    use crate::model::ShallowNetFactory;
    use tempfile::TempDir;

    fn feed_options() -> FeedOptions {
        FeedOptions {
            target_width: 4,
            target_height: 4,
            color_mode: ColorMode::Rgb,
            batch_size: 4,
            label_encoding: LabelEncoding::Categorical,
            shuffle: true,
            seed: 42,
        }
    }

    fn dataset(dir: &std::path::Path, per_class: usize) {
        for split in ["train", "test", "val"] {
            for (class, color) in [("red", [220u8, 30, 30]), ("blue", [30u8, 30, 220])] {
                let class_dir = dir.join(split).join(class);
                std::fs::create_dir_all(&class_dir).unwrap();
                for i in 0..per_class {
                    let img = image::RgbImage::from_pixel(6, 6, image::Rgb(color));
                    img.save(class_dir.join(format!("img_{i}.png"))).unwrap();
                }
            }
        }
    }

    fn run_config(epochs: usize) -> RunConfig {
        RunConfig {
            input_shape: InputShape {
                height: 4,
                width: 4,
                channels: 3,
            },
            num_classes: 2,
            optimizer: OptimizerKind::sgd(0.5),
            epochs,
            callbacks: vec![CallbackSpec::EpochLog],
        }
    }

    #[test]
    fn test_run_produces_aligned_result() {
        let dir = TempDir::new().unwrap();
        dataset(dir.path(), 4);
        let train = DataFeed::scan(&dir.path().join("train"), feed_options()).unwrap();
        let test = DataFeed::scan(&dir.path().join("test"), feed_options()).unwrap();
        let val = DataFeed::scan(&dir.path().join("val"), feed_options()).unwrap();
        let factory = ShallowNetFactory::new(42);
        let trainer = Trainer::new(&factory, &train, &test, &val);

        let scratch = TempDir::new().unwrap();
        let result = trainer.run(&run_config(3), scratch.path()).unwrap();

        assert_eq!(result.history.epochs_completed, 3);
        assert_eq!(result.y_true.len(), test.len());
        assert_eq!(result.y_pred.len(), test.len());
        assert_eq!(result.probabilities.len(), test.len());
        assert_eq!(result.test_filenames.len(), test.len());
        assert_eq!(result.class_names, vec!["blue", "red"]);
        // Scan order: all "blue" samples first, then all "red".
        assert_eq!(&result.y_true[..4], &[0, 0, 0, 0]);
        assert_eq!(&result.y_true[4..], &[1, 1, 1, 1]);
        // Uniform-color classes are trivially separable.
        assert!(result.test_accuracy() > 0.9);
    }

    #[test]
    fn test_epoch_log_written_to_text_dir() {
        let dir = TempDir::new().unwrap();
        dataset(dir.path(), 2);
        let train = DataFeed::scan(&dir.path().join("train"), feed_options()).unwrap();
        let test = DataFeed::scan(&dir.path().join("test"), feed_options()).unwrap();
        let val = DataFeed::scan(&dir.path().join("val"), feed_options()).unwrap();
        let factory = ShallowNetFactory::new(42);
        let trainer = Trainer::new(&factory, &train, &test, &val);

        let scratch = TempDir::new().unwrap();
        trainer.run(&run_config(2), scratch.path()).unwrap();

        let log = std::fs::read_to_string(scratch.path().join("epochs.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 2);
    }
}
