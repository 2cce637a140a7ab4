//! Reporting stage — writes one run's evaluation artifacts.
//!
//! Consumes a [`RunResult`] and stages plots, classification reports,
//! misclassification listings and probability reports into the run's
//! scratch layout (`images/`, `text/`, `text/probs/`) before the tracker
//! picks them up.

pub mod charts;
pub mod classification;

use std::fmt::Write as _;
use std::path::Path;

use crate::error::SweepError;
use crate::training::result::RunResult;

pub use charts::{BoxStats, box_stats};
pub use classification::{ClassReport, classification_report, confusion_matrix};

/// Write every report for one run.
pub fn write_all(
    result: &RunResult,
    images_dir: &Path,
    text_dir: &Path,
    probs_dir: &Path,
) -> Result<(), SweepError> {
    write_history_chart(result, images_dir)?;
    write_multiclass_report(result, images_dir, text_dir)?;
    write_classification_report(result, text_dir)?;
    write_wrong_predictions(result, text_dir)?;
    write_probability_reports(result, images_dir, probs_dir)?;
    Ok(())
}

/// Loss/accuracy curves over epochs.
pub fn write_history_chart(result: &RunResult, images_dir: &Path) -> Result<(), SweepError> {
    let svg = charts::history_chart(&result.history);
    std::fs::write(images_dir.join("history.svg"), svg)?;
    Ok(())
}

/// Confusion heatmap plus an overall accuracy summary.
pub fn write_multiclass_report(
    result: &RunResult,
    images_dir: &Path,
    text_dir: &Path,
) -> Result<(), SweepError> {
    if result.y_true.is_empty() {
        return Err(SweepError::report("no test predictions to report"));
    }
    let matrix = confusion_matrix(&result.y_true, &result.y_pred, result.class_names.len());
    let svg = charts::confusion_heatmap(&matrix, &result.class_names);
    std::fs::write(images_dir.join("confusion_matrix.svg"), svg)?;

    let mut summary = String::new();
    let _ = writeln!(summary, "samples: {}", result.y_true.len());
    let _ = writeln!(summary, "accuracy: {:.4}", result.test_accuracy());
    let _ = writeln!(summary, "classes: {}", result.class_names.join(", "));
    std::fs::write(text_dir.join("summary.txt"), summary)?;
    Ok(())
}

/// Per-class precision/recall/F1 table.
pub fn write_classification_report(result: &RunResult, text_dir: &Path) -> Result<(), SweepError> {
    let report = classification_report(&result.y_true, &result.y_pred, &result.class_names)?;
    std::fs::write(
        text_dir.join("classification_report.txt"),
        report.to_text(),
    )?;
    Ok(())
}

/// One line per misclassified test sample: filename, true, predicted.
pub fn write_wrong_predictions(result: &RunResult, text_dir: &Path) -> Result<(), SweepError> {
    let mut out = String::from("filename\ttrue\tpredicted\n");
    for ((filename, &truth), &pred) in result
        .test_filenames
        .iter()
        .zip(&result.y_true)
        .zip(&result.y_pred)
    {
        if truth != pred {
            let _ = writeln!(
                out,
                "{filename}\t{}\t{}",
                class_name(result, truth),
                class_name(result, pred)
            );
        }
    }
    std::fs::write(text_dir.join("wrong_predictions.txt"), out)?;
    Ok(())
}

/// Probability boxplot plus one per-class listing of probability rows.
pub fn write_probability_reports(
    result: &RunResult,
    images_dir: &Path,
    probs_dir: &Path,
) -> Result<(), SweepError> {
    if result.probabilities.len() != result.y_true.len() {
        return Err(SweepError::report(format!(
            "probability rows ({}) do not match labels ({})",
            result.probabilities.len(),
            result.y_true.len()
        )));
    }

    let mut stats = Vec::new();
    for (class, name) in result.class_names.iter().enumerate() {
        let true_class_probs: Vec<f64> = result
            .y_true
            .iter()
            .zip(&result.probabilities)
            .filter(|(t, _)| **t == class)
            .filter_map(|(_, row)| row.get(class).map(|&p| f64::from(p)))
            .collect();
        if let Some(summary) = box_stats(&true_class_probs) {
            stats.push((name.clone(), summary));
        }

        let mut listing = String::from("filename\tpredicted\tprobabilities\n");
        for ((filename, &truth), (row, &pred)) in result
            .test_filenames
            .iter()
            .zip(&result.y_true)
            .zip(result.probabilities.iter().zip(&result.y_pred))
        {
            if truth == class {
                let row_text: Vec<String> = row.iter().map(|p| format!("{p:.4}")).collect();
                let _ = writeln!(
                    listing,
                    "{filename}\t{}\t{}",
                    class_name(result, pred),
                    row_text.join(" ")
                );
            }
        }
        std::fs::write(probs_dir.join(format!("{name}.txt")), listing)?;
    }

    let svg = charts::probability_boxplot(&stats);
    std::fs::write(images_dir.join("probability_boxplot.svg"), svg)?;
    Ok(())
}

fn class_name(result: &RunResult, class: usize) -> &str {
    result
        .class_names
        .get(class)
        .map(String::as_str)
        .unwrap_or("?")
}
