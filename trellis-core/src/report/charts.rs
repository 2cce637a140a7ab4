//! SVG chart generation for run artifacts.
//!
//! Charts are written as small standalone SVG documents so a run's
//! `images/` artifacts can be opened anywhere without a rendering backend.

use std::fmt::Write;

use crate::training::history::RunHistory;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const MARGIN: f64 = 48.0;

/// Five-number summary for one class's probability distribution.
#[derive(Debug, Clone, Copy)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Five-number summary of `values`. Returns `None` for an empty slice.
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(BoxStats {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

/// Linear-interpolated quantile over a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

fn svg_open(out: &mut String, title: &str) {
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}"><rect width="{WIDTH}" height="{HEIGHT}" fill="white"/><text x="{}" y="24" text-anchor="middle" font-family="sans-serif" font-size="16">{title}</text>"#,
        WIDTH / 2.0
    );
}

fn polyline(out: &mut String, points: &[(f64, f64)], color: &str, dashed: bool) {
    if points.is_empty() {
        return;
    }
    let coords: Vec<String> = points.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
    let dash = if dashed { r#" stroke-dasharray="6,4""# } else { "" };
    let _ = write!(
        out,
        r#"<polyline fill="none" stroke="{color}" stroke-width="2"{dash} points="{}"/>"#,
        coords.join(" ")
    );
}

/// Train/validation loss and accuracy curves over epochs.
pub fn history_chart(history: &RunHistory) -> String {
    let epochs = history.epochs_completed.max(1);
    let max_loss = history
        .train_loss
        .iter()
        .chain(&history.val_loss)
        .copied()
        .fold(f64::MIN_POSITIVE, f64::max);

    let x = |epoch: usize| {
        MARGIN + (epoch as f64 / (epochs.saturating_sub(1).max(1)) as f64) * (WIDTH - 2.0 * MARGIN)
    };
    let y_loss = |loss: f64| MARGIN + (1.0 - loss / max_loss) * (HEIGHT - 2.0 * MARGIN);
    let y_acc = |acc: f64| MARGIN + (1.0 - acc) * (HEIGHT - 2.0 * MARGIN);

    let series = |values: &[f64], scale: &dyn Fn(f64) -> f64| -> Vec<(f64, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(e, &v)| (x(e), scale(v)))
            .collect()
    };

    let mut out = String::new();
    svg_open(&mut out, "Training history");
    polyline(&mut out, &series(&history.train_loss, &y_loss), "#d62728", false);
    polyline(&mut out, &series(&history.val_loss, &y_loss), "#d62728", true);
    polyline(&mut out, &series(&history.train_accuracy, &y_acc), "#1f77b4", false);
    polyline(&mut out, &series(&history.val_accuracy, &y_acc), "#1f77b4", true);
    let _ = write!(
        out,
        r##"<text x="{MARGIN}" y="{}" font-family="sans-serif" font-size="12" fill="#d62728">loss (dashed: val)</text><text x="{MARGIN}" y="{}" font-family="sans-serif" font-size="12" fill="#1f77b4">accuracy (dashed: val)</text></svg>"##,
        HEIGHT - 20.0,
        HEIGHT - 6.0
    );
    out
}

/// Confusion matrix heatmap; row = true class, column = predicted.
pub fn confusion_heatmap(matrix: &[Vec<usize>], class_names: &[String]) -> String {
    let k = class_names.len().max(1);
    let cell = ((WIDTH.min(HEIGHT) - 2.0 * MARGIN) / k as f64).min(64.0);
    let peak = matrix
        .iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let mut out = String::new();
    svg_open(&mut out, "Confusion matrix");
    for (row, counts) in matrix.iter().enumerate() {
        for (col, &count) in counts.iter().enumerate() {
            let x = MARGIN + col as f64 * cell;
            let y = MARGIN + row as f64 * cell;
            let opacity = count as f64 / peak;
            let _ = write!(
                out,
                r##"<rect x="{x:.1}" y="{y:.1}" width="{cell:.1}" height="{cell:.1}" fill="#1f77b4" fill-opacity="{opacity:.3}" stroke="#cccccc"/><text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="12">{count}</text>"##,
                x + cell / 2.0,
                y + cell / 2.0 + 4.0
            );
        }
    }
    for (i, name) in class_names.iter().enumerate() {
        let along = MARGIN + i as f64 * cell + cell / 2.0;
        let _ = write!(
            out,
            r#"<text x="{along:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="11">{name}</text><text x="{:.1}" y="{along:.1}" text-anchor="end" font-family="sans-serif" font-size="11">{name}</text>"#,
            MARGIN - 8.0,
            MARGIN - 8.0
        );
    }
    out.push_str("</svg>");
    out
}

/// One box per class summarizing true-class probability spread.
pub fn probability_boxplot(stats: &[(String, BoxStats)]) -> String {
    let n = stats.len().max(1);
    let slot = (WIDTH - 2.0 * MARGIN) / n as f64;
    let y = |p: f64| MARGIN + (1.0 - p.clamp(0.0, 1.0)) * (HEIGHT - 2.0 * MARGIN);

    let mut out = String::new();
    svg_open(&mut out, "True-class probability by class");
    for (i, (name, b)) in stats.iter().enumerate() {
        let center = MARGIN + slot * (i as f64 + 0.5);
        let half = (slot * 0.3).min(40.0);
        // Whiskers, box, median line.
        let _ = write!(
            out,
            r##"<line x1="{center:.1}" y1="{:.1}" x2="{center:.1}" y2="{:.1}" stroke="#333333"/><rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#aec7e8" stroke="#1f77b4"/><line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#1f77b4" stroke-width="2"/><text x="{center:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="11">{name}</text>"##,
            y(b.min),
            y(b.max),
            center - half,
            y(b.q3),
            half * 2.0,
            (y(b.q1) - y(b.q3)).max(1.0),
            center - half,
            y(b.median),
            center + half,
            y(b.median),
            HEIGHT - MARGIN + 16.0
        );
    }
    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_stats() {
        let stats = box_stats(&[0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.q1, 0.25);
        assert_eq!(stats.median, 0.5);
        assert_eq!(stats.q3, 0.75);
        assert_eq!(stats.max, 1.0);
    }

    #[test]
    fn test_box_stats_empty_is_none() {
        assert!(box_stats(&[]).is_none());
    }

    #[test]
    fn test_history_chart_has_series() {
        let mut history = RunHistory::default();
        history.record_epoch(0.9, 0.4, 1.0, 0.35);
        history.record_epoch(0.5, 0.7, 0.6, 0.6);
        let svg = history_chart(&history);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 4);
    }

    #[test]
    fn test_confusion_heatmap_cells() {
        let svg = confusion_heatmap(
            &[vec![3, 1], vec![0, 4]],
            &["cats".to_string(), "dogs".to_string()],
        );
        assert_eq!(svg.matches("<rect").count(), 1 + 4); // background + cells
        assert!(svg.contains("cats"));
    }

    #[test]
    fn test_boxplot_one_box_per_class() {
        let stats = vec![
            (
                "cats".to_string(),
                BoxStats {
                    min: 0.2,
                    q1: 0.4,
                    median: 0.5,
                    q3: 0.7,
                    max: 0.9,
                },
            ),
            (
                "dogs".to_string(),
                BoxStats {
                    min: 0.1,
                    q1: 0.3,
                    median: 0.6,
                    q3: 0.8,
                    max: 1.0,
                },
            ),
        ];
        let svg = probability_boxplot(&stats);
        assert_eq!(svg.matches("<rect").count(), 1 + 2);
    }
}
