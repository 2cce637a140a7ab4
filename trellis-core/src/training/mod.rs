//! Training infrastructure — trainer, callbacks, history, run results.

pub mod callbacks;
pub mod history;
pub mod result;
pub mod trainer;

pub use callbacks::{CallbackAction, TrainingCallback};
pub use history::RunHistory;
pub use result::RunResult;
pub use trainer::Trainer;
