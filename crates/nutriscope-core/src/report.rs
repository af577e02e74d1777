//! Aggregated evaluation results of a training run.
use serde::{Deserialize, Serialize};

use crate::metrics::ClassMetrics;
use crate::stats::mean_and_std;

/// Accuracy and F1 of one cross-validation fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    pub fold: usize,
    pub accuracy: f64,
    pub f1: f64,
}

/// Mean and population std of fold scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
    pub f1_mean: f64,
    pub f1_std: f64,
    pub folds: Vec<FoldScore>,
}

impl CrossValidationSummary {
    /// Aggregate fold scores; `None` when there are no folds.
    pub fn from_folds(folds: Vec<FoldScore>) -> Option<Self> {
        let accuracies: Vec<f64> = folds.iter().map(|f| f.accuracy).collect();
        let f1s: Vec<f64> = folds.iter().map(|f| f.f1).collect();
        let (accuracy_mean, accuracy_std) = mean_and_std(&accuracies)?;
        let (f1_mean, f1_std) = mean_and_std(&f1s)?;
        Some(CrossValidationSummary {
            accuracy_mean,
            accuracy_std,
            f1_mean,
            f1_std,
            folds,
        })
    }

    /// `(cv_metric, value)` rows of the cross-validation summary table.
    pub fn rows(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("accuracy_mean", self.accuracy_mean),
            ("accuracy_std", self.accuracy_std),
            ("f1_mean", self.f1_mean),
            ("f1_std", self.f1_std),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub f1: f64,
    /// Absent when the held-out split contains a single class.
    pub roc_auc: Option<f64>,
    pub per_class: Vec<ClassMetrics>,
    pub classification_report: String,
    /// Absent when stratified folds could not be formed.
    pub cross_validation: Option<CrossValidationSummary>,
}

impl EvaluationReport {
    /// `(metric, value)` rows of the key findings table.
    pub fn key_metrics(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("accuracy", Some(self.accuracy)),
            ("f1", Some(self.f1)),
            ("roc_auc", self.roc_auc),
        ]
    }

    pub fn log_summary(&self) {
        log::info!("Test Accuracy: {:.4}", self.accuracy);
        log::info!("Test F1: {:.4}", self.f1);
        match self.roc_auc {
            Some(auc) => log::info!("Test ROC AUC: {:.4}", auc),
            None => log::info!("Test ROC AUC: undefined (single class in held-out split)"),
        }
        if let Some(cv) = &self.cross_validation {
            log::info!(
                "CV accuracy: {:.4} +/- {:.4}, CV F1: {:.4} +/- {:.4} ({} folds)",
                cv.accuracy_mean,
                cv.accuracy_std,
                cv.f1_mean,
                cv.f1_std,
                cv.folds.len()
            );
        }
    }
}
