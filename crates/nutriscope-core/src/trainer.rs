//! Training and evaluation of the hidden hunger classifier.
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::TrainerConfig;
use crate::data_handling::TrainingDataset;
use crate::error::{NutriError, Result};
use crate::metrics::{accuracy, classification_report, f1_score, per_class_metrics, roc_auc};
use crate::pipeline::FittedPipeline;
use crate::report::{CrossValidationSummary, EvaluationReport, FoldScore};

/// Held-out rows with their true and predicted labels.
#[derive(Debug, Clone)]
pub struct HeldOutPredictions {
    /// Test-split rows without the label column.
    pub features: TrainingDataset,
    pub true_labels: Vec<u8>,
    pub predicted_labels: Vec<u8>,
    pub predicted_proba: Vec<f64>,
}

impl HeldOutPredictions {
    pub fn len(&self) -> usize {
        self.true_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.true_labels.is_empty()
    }
}

#[derive(Debug)]
pub struct TrainingRun {
    pub pipeline: FittedPipeline,
    pub report: EvaluationReport,
    pub predictions: HeldOutPredictions,
}

/// Row indices grouped by label, in label order.
fn indices_by_class(labels: &[u8]) -> BTreeMap<u8, Vec<usize>> {
    let mut classes: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        classes.entry(label).or_default().push(i);
    }
    classes
}

/// Seeded stratified train/test split, returning `(train, test)` row indices
/// in ascending order.
///
/// The test set holds `ceil(test_fraction * n)` rows, spread over classes in
/// proportion to their size (largest remainders first). With more than one
/// class every class needs at least two members.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = labels.len();
    if n < 2 {
        return Err(NutriError::Data(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);
    let classes = indices_by_class(labels);
    if classes.len() > 1 {
        if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
            return Err(NutriError::Data(format!(
                "class {} has only {} member(s); stratified splitting needs at least 2",
                label,
                members.len()
            )));
        }
    }

    // proportional allocation, then hand out the remainder by largest fraction
    let mut allocation: Vec<(u8, usize, f64)> = classes
        .iter()
        .map(|(&label, members)| {
            let exact = members.len() as f64 * n_test as f64 / n as f64;
            (label, exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let assigned: usize = allocation.iter().map(|a| a.1).sum();
    let mut by_remainder: Vec<usize> = (0..allocation.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        allocation[b]
            .2
            .partial_cmp(&allocation[a].2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    for &i in by_remainder.iter().take(n_test.saturating_sub(assigned)) {
        allocation[i].1 += 1;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (label, n_class_test, _) in allocation {
        let mut members = classes[&label].clone();
        members.shuffle(&mut rng);
        let (class_test, class_train) = members.split_at(n_class_test.min(members.len()));
        test.extend_from_slice(class_test);
        train.extend_from_slice(class_train);
    }
    train.sort_unstable();
    test.sort_unstable();

    if train.is_empty() {
        return Err(NutriError::Data("train split is empty".to_string()));
    }
    Ok((train, test))
}

/// Seeded stratified k-fold assignment. Returns the test indices of each
/// fold (ascending); the training rows of a fold are all other rows.
///
/// Members of each class are shuffled and dealt round-robin over the folds,
/// continuing from where the previous class stopped, so fold sizes differ by
/// at most one. Fails when the largest class has fewer than `k` rows.
pub fn stratified_k_fold(labels: &[u8], k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(NutriError::Config(format!("need at least 2 folds, got {}", k)));
    }
    let classes = indices_by_class(labels);
    let largest = classes.values().map(Vec::len).max().unwrap_or(0);
    if largest < k {
        return Err(NutriError::Data(format!(
            "cannot form {} stratified folds: the largest class has {} row(s)",
            k, largest
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0usize;
    for members in classes.values() {
        let mut members = members.clone();
        members.shuffle(&mut rng);
        for idx in members {
            folds[next % k].push(idx);
            next += 1;
        }
    }
    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Complement of sorted `test` within `0..n`.
fn complement(n: usize, test: &[usize]) -> Vec<usize> {
    let mut in_test = vec![false; n];
    for &i in test {
        in_test[i] = true;
    }
    (0..n).filter(|&i| !in_test[i]).collect()
}

/// Stratified k-fold cross-validation of the configured pipeline over the
/// whole dataset. Folds run in parallel; scores come back in fold order.
pub fn cross_validate(dataset: &TrainingDataset, config: &TrainerConfig) -> Result<CrossValidationSummary> {
    let labels = dataset.labels(&config.target_column)?;
    let folds = stratified_k_fold(&labels, config.cv_folds, config.seed)?;

    let scores = folds
        .par_iter()
        .enumerate()
        .map(|(fold, test_idx)| {
            let train_idx = complement(labels.len(), test_idx);
            let pipeline = FittedPipeline::fit(
                &dataset.select_rows(&train_idx),
                &config.target_column,
                &config.model,
                config.seed,
            )?;
            let y_pred = pipeline.predict(&dataset.select_rows(test_idx))?;
            let y_true: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();
            let score = FoldScore {
                fold,
                accuracy: accuracy(&y_true, &y_pred),
                f1: f1_score(&y_true, &y_pred),
            };
            log::debug!(
                "fold {}: {} train / {} test rows, accuracy {:.4}, f1 {:.4}",
                fold,
                train_idx.len(),
                test_idx.len(),
                score.accuracy,
                score.f1
            );
            Ok(score)
        })
        .collect::<Result<Vec<FoldScore>>>()?;

    CrossValidationSummary::from_folds(scores)
        .ok_or_else(|| NutriError::Data("cross-validation produced no folds".to_string()))
}

/// Split, fit, evaluate and cross-validate a classifier on `dataset`.
///
/// Configuration, schema and split problems are returned as errors. An
/// undefined ROC-AUC or cross-validation that cannot run is recorded as an
/// absent value in the report instead.
pub fn train_and_evaluate(dataset: &TrainingDataset, config: &TrainerConfig) -> Result<TrainingRun> {
    config.validate()?;
    let target = config.target_column.as_str();
    let labels = dataset.labels(target)?;
    dataset.log_input_data_summary(target);

    let (train_idx, test_idx) = stratified_split(&labels, config.test_fraction, config.seed)?;
    log::info!(
        "Split {} rows into {} train and {} test rows",
        labels.len(),
        train_idx.len(),
        test_idx.len()
    );

    log::info!("Fitting {} pipeline", config.model.name());
    let pipeline = FittedPipeline::fit(&dataset.select_rows(&train_idx), target, &config.model, config.seed)?;

    let test_set = dataset.select_rows(&test_idx);
    let (predicted_labels, predicted_proba) = pipeline.predict_with_probabilities(&test_set)?;
    let true_labels: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();

    let auc = roc_auc(&true_labels, &predicted_proba);
    if auc.is_none() {
        log::warn!("Held-out split holds a single class; ROC AUC is undefined and omitted");
    }

    let cross_validation = match cross_validate(dataset, config) {
        Ok(summary) => Some(summary),
        Err(e) => {
            log::warn!("Skipping cross-validation: {}", e);
            None
        }
    };

    let report = EvaluationReport {
        accuracy: accuracy(&true_labels, &predicted_labels),
        f1: f1_score(&true_labels, &predicted_labels),
        roc_auc: auc,
        per_class: per_class_metrics(&true_labels, &predicted_labels),
        classification_report: classification_report(&true_labels, &predicted_labels),
        cross_validation,
    };
    report.log_summary();

    Ok(TrainingRun {
        pipeline,
        report,
        predictions: HeldOutPredictions {
            features: test_set.without_column(target),
            true_labels,
            predicted_labels,
            predicted_proba,
        },
    })
}
