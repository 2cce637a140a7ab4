//! Data pipeline — dataset scanning, preprocessing, batch feeds.

pub mod feed;
pub mod source;
pub mod transform;

pub use feed::{DataFeed, FeedOptions, ImageBatch, LabelBatch};
pub use source::{ImageFolderSource, ImageSample};
pub use transform::rescale;
