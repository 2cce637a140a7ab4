//! Restartable, seeded, batch-producing data feeds.
//!
//! A [`DataFeed`] wraps a scanned image tree and yields preprocessed
//! batches one epoch at a time. Feeds hold no cursor state between epochs:
//! every [`DataFeed::epoch`] call restarts from a deterministic, seeded
//! sample order, so the same feed can be re-driven run after run.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;

use crate::config::{ColorMode, LabelEncoding, SweepSettings};
use crate::data::source::{ImageFolderSource, ImageSample};
use crate::data::transform;
use crate::error::SweepError;

/// Feed construction parameters, fixed for the whole sweep.
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    pub target_width: u32,
    pub target_height: u32,
    pub color_mode: ColorMode,
    pub batch_size: usize,
    pub label_encoding: LabelEncoding,
    pub shuffle: bool,
    pub seed: u64,
}

impl FeedOptions {
    pub fn from_settings(settings: &SweepSettings) -> Self {
        Self {
            target_width: settings.image_width,
            target_height: settings.image_height,
            color_mode: settings.color_mode,
            batch_size: settings.batch_size,
            label_encoding: settings.label_encoding,
            shuffle: settings.shuffle,
            seed: settings.seed,
        }
    }
}

/// Labels for one batch.
#[derive(Debug, Clone)]
pub enum LabelBatch {
    /// One-hot rows, `len = samples * num_classes`.
    Categorical { rows: Vec<f32>, num_classes: usize },
    /// One class index per sample.
    Sparse(Vec<usize>),
}

impl LabelBatch {
    /// Class index per sample, regardless of encoding.
    pub fn class_indices(&self) -> Vec<usize> {
        match self {
            LabelBatch::Sparse(indices) => indices.clone(),
            LabelBatch::Categorical { rows, num_classes } => rows
                .chunks(*num_classes)
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                        .map(|(i, _)| i)
                        .unwrap_or(0)
                })
                .collect(),
        }
    }
}

/// One preprocessed batch of images with labels.
#[derive(Debug, Clone)]
pub struct ImageBatch {
    /// Row-major pixels in [0, 1], `len = samples * height * width * channels`.
    pub pixels: Vec<f32>,
    pub sample_count: usize,
    pub labels: LabelBatch,
    /// Indices into the source's sample list, for report alignment.
    pub sample_indices: Vec<usize>,
}

/// A reproducible, batch-producing source of labeled image data.
pub struct DataFeed {
    source: ImageFolderSource,
    options: FeedOptions,
}

impl DataFeed {
    pub fn new(source: ImageFolderSource, options: FeedOptions) -> Result<Self, SweepError> {
        if options.batch_size == 0 {
            return Err(SweepError::dataset("batch size must be positive"));
        }
        Ok(Self { source, options })
    }

    /// Scan `root` and wrap it in a feed.
    pub fn scan(root: &Path, options: FeedOptions) -> Result<Self, SweepError> {
        Self::new(ImageFolderSource::scan(root)?, options)
    }

    pub fn class_names(&self) -> &[String] {
        self.source.class_names()
    }

    pub fn num_classes(&self) -> usize {
        self.source.num_classes()
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    /// Relative sample paths in scan order, aligned with batch
    /// `sample_indices`.
    pub fn filenames(&self) -> Vec<String> {
        self.source
            .samples()
            .iter()
            .map(|s| s.relative_path.clone())
            .collect()
    }

    pub fn batches_per_epoch(&self) -> usize {
        self.source.len().div_ceil(self.options.batch_size)
    }

    /// Deterministic sample order for one epoch.
    ///
    /// Epoch `e` shuffles with `seed + e`: reproducible across feeds that
    /// share a seed and across repeated sweep invocations, while still
    /// reordering between epochs.
    fn epoch_order(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.source.len()).collect();
        if self.options.shuffle {
            let mut rng = StdRng::seed_from_u64(self.options.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }
        order
    }

    /// Iterate one epoch's batches. Each call restarts the feed.
    pub fn epoch(&self, epoch: usize) -> EpochBatches<'_> {
        EpochBatches {
            feed: self,
            order: self.epoch_order(epoch),
            cursor: 0,
        }
    }

    fn load_pixels(&self, sample: &ImageSample) -> Result<Vec<f32>, SweepError> {
        let image = image::open(&sample.path)?;
        Ok(transform::preprocess(
            &image,
            self.options.target_width,
            self.options.target_height,
            self.options.color_mode,
        ))
    }

    fn encode_labels(&self, class_indices: &[usize]) -> LabelBatch {
        match self.options.label_encoding {
            LabelEncoding::Sparse => LabelBatch::Sparse(class_indices.to_vec()),
            LabelEncoding::Categorical => {
                let num_classes = self.num_classes();
                let mut rows = vec![0.0; class_indices.len() * num_classes];
                for (i, &class) in class_indices.iter().enumerate() {
                    rows[i * num_classes + class] = 1.0;
                }
                LabelBatch::Categorical { rows, num_classes }
            }
        }
    }
}

/// Iterator over one epoch's batches.
pub struct EpochBatches<'a> {
    feed: &'a DataFeed,
    order: Vec<usize>,
    cursor: usize,
}

impl Iterator for EpochBatches<'_> {
    type Item = Result<ImageBatch, SweepError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.feed.options.batch_size).min(self.order.len());
        let batch_indices: Vec<usize> = self.order[self.cursor..end].to_vec();
        self.cursor = end;

        let mut pixels = Vec::new();
        let mut class_indices = Vec::with_capacity(batch_indices.len());
        for &index in &batch_indices {
            let sample = &self.feed.source.samples()[index];
            match self.feed.load_pixels(sample) {
                Ok(p) => pixels.extend_from_slice(&p),
                Err(e) => return Some(Err(e)),
            }
            class_indices.push(sample.class_index);
        }

        Some(Ok(ImageBatch {
            pixels,
            sample_count: batch_indices.len(),
            labels: self.feed.encode_labels(&class_indices),
            sample_indices: batch_indices,
        }))
    }
}
