//! Confusion matrix and per-class classification scores.

use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Scores for one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassScores {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Full multiclass report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassReport {
    pub per_class: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    pub total: usize,
}

/// Row = true class, column = predicted class.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], num_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; num_classes]; num_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < num_classes && p < num_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

/// Compute per-class precision/recall/F1 plus macro and weighted averages.
///
/// Errors on empty or mismatched label vectors (a degenerate label set is a
/// reporting error and aborts the sweep).
pub fn classification_report(
    y_true: &[usize],
    y_pred: &[usize],
    class_names: &[String],
) -> Result<ClassReport, SweepError> {
    if y_true.is_empty() {
        return Err(SweepError::report("no labels to report on"));
    }
    if y_true.len() != y_pred.len() {
        return Err(SweepError::report(format!(
            "label length mismatch: {} true vs {} predicted",
            y_true.len(),
            y_pred.len()
        )));
    }

    let k = class_names.len();
    let matrix = confusion_matrix(y_true, y_pred, k);
    let total = y_true.len();
    let correct: usize = (0..k).map(|c| matrix[c][c]).sum();

    let mut per_class = Vec::with_capacity(k);
    for (c, name) in class_names.iter().enumerate() {
        let support: usize = matrix[c].iter().sum();
        let predicted: usize = (0..k).map(|r| matrix[r][c]).sum();
        let tp = matrix[c][c];
        let precision = if predicted > 0 {
            tp as f64 / predicted as f64
        } else {
            0.0
        };
        let recall = if support > 0 {
            tp as f64 / support as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        per_class.push(ClassScores {
            name: name.clone(),
            precision,
            recall,
            f1,
            support,
        });
    }

    let k_f = k as f64;
    let macro_precision = per_class.iter().map(|s| s.precision).sum::<f64>() / k_f;
    let macro_recall = per_class.iter().map(|s| s.recall).sum::<f64>() / k_f;
    let macro_f1 = per_class.iter().map(|s| s.f1).sum::<f64>() / k_f;
    let weighted_f1 = per_class
        .iter()
        .map(|s| s.f1 * s.support as f64)
        .sum::<f64>()
        / total as f64;

    Ok(ClassReport {
        per_class,
        accuracy: correct as f64 / total as f64,
        macro_precision,
        macro_recall,
        macro_f1,
        weighted_f1,
        total,
    })
}

impl ClassReport {
    /// Fixed-width table in the familiar per-class layout.
    pub fn to_text(&self) -> String {
        let name_width = self
            .per_class
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(8)
            .max(12);
        let mut out = String::new();
        out.push_str(&format!(
            "{:>name_width$}  precision    recall  f1-score   support\n\n",
            ""
        ));
        for scores in &self.per_class {
            out.push_str(&format!(
                "{:>name_width$}     {:.4}    {:.4}    {:.4}  {:>8}\n",
                scores.name, scores.precision, scores.recall, scores.f1, scores.support
            ));
        }
        out.push('\n');
        out.push_str(&format!(
            "{:>name_width$}                        {:.4}  {:>8}\n",
            "accuracy", self.accuracy, self.total
        ));
        out.push_str(&format!(
            "{:>name_width$}     {:.4}    {:.4}    {:.4}  {:>8}\n",
            "macro avg", self.macro_precision, self.macro_recall, self.macro_f1, self.total
        ));
        out.push_str(&format!(
            "{:>name_width$}                        {:.4}  {:>8}\n",
            "weighted f1", self.weighted_f1, self.total
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_confusion_matrix() {
        let matrix = confusion_matrix(&[0, 0, 1, 1], &[0, 1, 1, 1], 2);
        assert_eq!(matrix, vec![vec![1, 1], vec![0, 2]]);
    }

    #[test]
    fn test_report_scores() {
        let report =
            classification_report(&[0, 0, 1, 1], &[0, 1, 1, 1], &names(&["cats", "dogs"])).unwrap();
        assert!((report.accuracy - 0.75).abs() < 1e-9);

        let cats = &report.per_class[0];
        assert!((cats.precision - 1.0).abs() < 1e-9);
        assert!((cats.recall - 0.5).abs() < 1e-9);
        assert_eq!(cats.support, 2);

        let dogs = &report.per_class[1];
        assert!((dogs.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((dogs.recall - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_text_lists_classes() {
        let report =
            classification_report(&[0, 1], &[0, 1], &names(&["cats", "dogs"])).unwrap();
        let text = report.to_text();
        assert!(text.contains("cats"));
        assert!(text.contains("dogs"));
        assert!(text.contains("accuracy"));
    }

    #[test]
    fn test_empty_labels_error() {
        let err = classification_report(&[], &[], &names(&["cats"]));
        assert!(matches!(err, Err(SweepError::Report(_))));
    }

    #[test]
    fn test_mismatched_labels_error() {
        let err = classification_report(&[0, 1], &[0], &names(&["cats", "dogs"]));
        assert!(matches!(err, Err(SweepError::Report(_))));
    }

    #[test]
    fn test_absent_class_gets_zero_scores() {
        let report =
            classification_report(&[0, 0], &[0, 0], &names(&["cats", "dogs"])).unwrap();
        let dogs = &report.per_class[1];
        assert_eq!(dogs.support, 0);
        assert_eq!(dogs.precision, 0.0);
        assert_eq!(dogs.recall, 0.0);
        assert_eq!(dogs.f1, 0.0);
    }
}
