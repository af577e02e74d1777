//! Evaluation metrics for the binary hidden hunger classifier
//!
//! Implements the standard metrics reported after training:
//! - Confusion matrix, accuracy, precision, recall, F1
//! - ROC-AUC (undefined, hence `None`, when only one class is present)
//! - A per-class classification report in plain text

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Confusion matrix for one positive label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Count outcomes treating `positive` as the positive label.
    ///
    /// # Panics
    ///
    /// If `y_true` and `y_pred` differ in length.
    pub fn from_labels(y_true: &[u8], y_pred: &[u8], positive: u8) -> Self {
        assert_eq!(y_true.len(), y_pred.len(), "Prediction and ground truth lengths must match");

        let mut matrix = Self::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            match (truth == positive, pred == positive) {
                (true, true) => matrix.tp += 1,
                (false, false) => matrix.tn += 1,
                (false, true) => matrix.fp += 1,
                (true, false) => matrix.fn_ += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// TP / (TP + FP), 0 when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// TP / (TP + FN), 0 when there are no positives.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Harmonic mean of precision and recall; zero division yields 0.
    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let denom = precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / denom
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Fraction of matching labels (0 for empty input).
///
/// # Panics
///
/// If `y_true` and `y_pred` differ in length.
pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len(), "Prediction and ground truth lengths must match");
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(correct, y_true.len())
}

/// F1 of the positive class (label 1), with zero division mapped to 0.
///
/// # Panics
///
/// If `y_true` and `y_pred` differ in length.
pub fn f1_score(y_true: &[u8], y_pred: &[u8]) -> f64 {
    ConfusionMatrix::from_labels(y_true, y_pred, 1).f1_score()
}

/// Area under the ROC curve for class-1 scores.
///
/// Computed from average ranks, so tied scores contribute one half. Returns
/// `None` when `y_true` holds fewer than two distinct labels, where the
/// metric is undefined.
///
/// # Panics
///
/// If `y_true` and `scores` differ in length.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    assert_eq!(y_true.len(), scores.len(), "Scores and labels must have the same length");

    let n_pos = y_true.iter().filter(|&&l| l == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; ties share the average of their positions
        let avg_rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1)
        .map(|(_, &r)| r)
        .sum();
    let n_pos_f = n_pos as f64;
    Some((pos_rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64))
}

/// Precision, recall, F1 and support of one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Metrics for every label present in either `y_true` or `y_pred`, sorted by label.
///
/// # Panics
///
/// If `y_true` and `y_pred` differ in length.
pub fn per_class_metrics(y_true: &[u8], y_pred: &[u8]) -> Vec<ClassMetrics> {
    let labels: BTreeSet<u8> = y_true.iter().chain(y_pred).copied().collect();
    labels
        .into_iter()
        .map(|label| {
            let cm = ConfusionMatrix::from_labels(y_true, y_pred, label);
            ClassMetrics {
                label,
                precision: cm.precision(),
                recall: cm.recall(),
                f1: cm.f1_score(),
                support: cm.tp + cm.fn_,
            }
        })
        .collect()
}

/// Plain-text per-class report laid out like scikit-learn's
/// `classification_report` (two decimals, zero division as 0).
///
/// # Panics
///
/// If `y_true` and `y_pred` differ in length.
pub fn classification_report(y_true: &[u8], y_pred: &[u8]) -> String {
    let classes = per_class_metrics(y_true, y_pred);
    let width = classes
        .iter()
        .map(|c| c.label.to_string().len())
        .max()
        .unwrap_or(0)
        .max("weighted avg".len());

    let mut out = format!("{:>width$} ", "", width = width);
    for header in ["precision", "recall", "f1-score", "support"] {
        out.push_str(&format!(" {:>9}", header));
    }
    out.push_str("\n\n");

    for c in &classes {
        out.push_str(&metric_row(&c.label.to_string(), c.precision, c.recall, c.f1, c.support, width));
    }
    out.push('\n');

    let total: usize = classes.iter().map(|c| c.support).sum();
    out.push_str(&format!(
        "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}\n",
        "accuracy",
        "",
        "",
        accuracy(y_true, y_pred),
        total,
        width = width
    ));

    let n = classes.len().max(1) as f64;
    let macro_avg = |f: fn(&ClassMetrics) -> f64| classes.iter().map(f).sum::<f64>() / n;
    out.push_str(&metric_row(
        "macro avg",
        macro_avg(|c| c.precision),
        macro_avg(|c| c.recall),
        macro_avg(|c| c.f1),
        total,
        width,
    ));

    let weighted_avg = |f: fn(&ClassMetrics) -> f64| {
        if total == 0 {
            return 0.0;
        }
        classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
    };
    out.push_str(&metric_row(
        "weighted avg",
        weighted_avg(|c| c.precision),
        weighted_avg(|c| c.recall),
        weighted_avg(|c| c.f1),
        total,
        width,
    ));

    out
}

fn metric_row(name: &str, precision: f64, recall: f64, f1: f64, support: usize, width: usize) -> String {
    format!(
        "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
        name,
        precision,
        recall,
        f1,
        support,
        width = width
    )
}
