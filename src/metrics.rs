use std::collections::BTreeSet;

use crate::types::FoldIndex;

/// Aggregate balance metrics for per-fold row counts.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldSkew {
    /// Rows across all folds.
    pub total: usize,
    /// Number of folds.
    pub folds: usize,
    /// Smallest fold.
    pub min: usize,
    /// Largest fold.
    pub max: usize,
    /// Average rows per fold.
    pub mean: f64,
    /// Largest fold's share of `total`.
    pub max_share: f64,
    /// Smallest fold's share of `total`.
    pub min_share: f64,
    /// `max - min`; stratified dealing keeps this at 0 or 1.
    pub spread: usize,
    /// Count and share for every fold, in fold order.
    pub per_fold: Vec<FoldShare>,
}

/// One fold's share of a class.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldShare {
    /// Fold index.
    pub fold: FoldIndex,
    /// Rows in this fold.
    pub count: usize,
    /// `count / total`.
    pub share: f64,
}

/// Compute balance metrics from per-fold counts (index = fold).
pub fn fold_skew(counts: &[usize]) -> Option<FoldSkew> {
    let min = *counts.iter().min()?;
    let max = *counts.iter().max()?;
    let total: usize = counts.iter().sum();
    let folds = counts.len();
    let share = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let per_fold = counts
        .iter()
        .enumerate()
        .map(|(fold, &count)| FoldShare {
            fold,
            count,
            share: share(count),
        })
        .collect();
    Some(FoldSkew {
        total,
        folds,
        min,
        max,
        mean: total as f64 / folds as f64,
        max_share: share(max),
        min_share: share(min),
        spread: max - min,
        per_fold,
    })
}

/// Index of the largest value in each row; the first maximum wins.
pub fn argmax_rows(rows: &[Vec<f32>]) -> Vec<usize> {
    rows.iter()
        .map(|row| {
            let mut best = 0;
            for (idx, value) in row.iter().enumerate() {
                if *value > row[best] {
                    best = idx;
                }
            }
            best
        })
        .collect()
}

/// Row-wise softmax, shifted by the row max for numerical stability.
pub fn softmax_rows(rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
    rows.iter()
        .map(|row| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exps: Vec<f32> = row.iter().map(|value| (value - max).exp()).collect();
            let sum: f32 = exps.iter().sum();
            exps.into_iter().map(|value| value / sum).collect()
        })
        .collect()
}

/// Fraction of predictions equal to the ground truth.
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_pred
        .iter()
        .zip(y_true)
        .filter(|(pred, truth)| pred == truth)
        .count();
    hits as f64 / y_true.len() as f64
}

/// Confusion matrix over a fixed, sorted label set.
///
/// `matrix[i][j]` counts samples whose true label is `labels[i]` and whose
/// prediction is `labels[j]`.
#[derive(Clone, Debug)]
pub struct ConfusionMatrix {
    labels: Vec<usize>,
    matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from predictions; the label set is the sorted union of both inputs.
    pub fn from_predictions(y_pred: &[usize], y_true: &[usize]) -> Self {
        let labels: Vec<usize> = y_pred
            .iter()
            .chain(y_true)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut matrix = vec![vec![0; labels.len()]; labels.len()];
        for (pred, truth) in y_pred.iter().zip(y_true) {
            let (Ok(row), Ok(col)) = (labels.binary_search(truth), labels.binary_search(pred))
            else {
                continue;
            };
            matrix[row][col] += 1;
        }
        Self { labels, matrix }
    }

    /// Labels in ascending order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    fn position(&self, label: usize) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    /// Rows predicted and labelled `label`.
    pub fn true_positives(&self, label: usize) -> usize {
        self.position(label).map_or(0, |idx| self.matrix[idx][idx])
    }

    /// Rows predicted `label` whose gold label differs.
    pub fn false_positives(&self, label: usize) -> usize {
        self.position(label).map_or(0, |col| {
            (0..self.labels.len())
                .filter(|&row| row != col)
                .map(|row| self.matrix[row][col])
                .sum()
        })
    }

    /// Rows labelled `label` but predicted otherwise.
    pub fn false_negatives(&self, label: usize) -> usize {
        self.position(label).map_or(0, |row| {
            (0..self.labels.len())
                .filter(|&col| col != row)
                .map(|col| self.matrix[row][col])
                .sum()
        })
    }

    /// Number of samples whose true label is `label`.
    pub fn support(&self, label: usize) -> usize {
        self.position(label)
            .map_or(0, |row| self.matrix[row].iter().sum())
    }

    /// Number of scored rows.
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Share of rows on the diagonal.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.labels.len()).map(|idx| self.matrix[idx][idx]).sum();
        correct as f64 / total as f64
    }

    /// Precision/recall/F1/support for one label; undefined ratios are 0.0.
    pub fn class_metrics(&self, label: usize) -> ClassMetrics {
        let tp = self.true_positives(label) as f64;
        let fp = self.false_positives(label) as f64;
        let fn_ = self.false_negatives(label) as f64;
        let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            label,
            precision,
            recall,
            f1,
            support: self.support(label),
        }
    }
}

/// Per-class metrics row of a classification report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassMetrics {
    /// Class label.
    pub label: usize,
    /// `tp / (tp + fp)`, 0 when nothing was predicted.
    pub precision: f64,
    /// `tp / (tp + fn)`, 0 when the class has no support.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Rows whose gold label is `label`.
    pub support: usize,
}

/// Binary F1 for `positive_label`; 0.0 when precision and recall are both undefined.
pub fn binary_f1(y_pred: &[usize], y_true: &[usize], positive_label: usize) -> f64 {
    ConfusionMatrix::from_predictions(y_pred, y_true)
        .class_metrics(positive_label)
        .f1
}

const REPORT_DIGITS: usize = 2;
const REPORT_COLUMN: usize = 9;

/// sklearn-style text report: per-class rows, accuracy, macro and weighted averages.
pub fn classification_report(y_pred: &[usize], y_true: &[usize]) -> String {
    let cm = ConfusionMatrix::from_predictions(y_pred, y_true);
    let rows: Vec<ClassMetrics> = cm
        .labels()
        .iter()
        .map(|&label| cm.class_metrics(label))
        .collect();
    let names: Vec<String> = rows.iter().map(|row| row.label.to_string()).collect();
    let width = names
        .iter()
        .map(String::len)
        .chain(std::iter::once("weighted avg".len()))
        .max()
        .unwrap_or(0);
    let d = REPORT_DIGITS;
    let c = REPORT_COLUMN;

    let mut report = format!(
        "{:>width$}  {:>c$} {:>c$} {:>c$} {:>c$}\n\n",
        "", "precision", "recall", "f1-score", "support"
    );
    for (name, row) in names.iter().zip(&rows) {
        report.push_str(&format!(
            "{name:>width$}  {:>c$.d$} {:>c$.d$} {:>c$.d$} {:>c$}\n",
            row.precision, row.recall, row.f1, row.support
        ));
    }
    report.push('\n');

    let total = cm.total();
    report.push_str(&format!(
        "{:>width$}  {:>c$} {:>c$} {:>c$.d$} {:>c$}\n",
        "accuracy",
        "",
        "",
        cm.accuracy(),
        total
    ));

    let uniform = vec![1.0; rows.len()];
    let by_support: Vec<f64> = rows.iter().map(|row| row.support as f64).collect();
    for (name, weights) in [("macro avg", &uniform), ("weighted avg", &by_support)] {
        let (precision, recall, f1) = weighted_means(&rows, weights);
        report.push_str(&format!(
            "{name:>width$}  {precision:>c$.d$} {recall:>c$.d$} {f1:>c$.d$} {total:>c$}\n"
        ));
    }
    report
}

fn weighted_means(rows: &[ClassMetrics], weights: &[f64]) -> (f64, f64, f64) {
    let norm: f64 = weights.iter().sum();
    if norm == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let mean = |pick: fn(&ClassMetrics) -> f64| {
        rows.iter()
            .zip(weights)
            .map(|(row, weight)| pick(row) * weight)
            .sum::<f64>()
            / norm
    };
    (
        mean(|row| row.precision),
        mean(|row| row.recall),
        mean(|row| row.f1),
    )
}
