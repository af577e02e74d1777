//! Column-wise feature preprocessing.
//!
//! Declared categorical columns are one-hot encoded and every other non-label
//! column is standardized with a per-column mean/std `Scaler`. Fitting returns
//! a `FittedTransform` whose statistics are frozen; transforming never looks
//! at the statistics of the data being transformed.
use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data_handling::{ColumnData, TrainingDataset, CATEGORICAL_COLUMNS, LABEL_COLUMN};
use crate::error::{NutriError, Result};

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Fit from columns of optional values. Missing cells are skipped; a
    /// column with zero variance (or no values) scales by 1.0.
    pub fn fit(columns: &[&[Option<f64>]]) -> Scaler {
        let mut mean = Vec::with_capacity(columns.len());
        let mut std = Vec::with_capacity(columns.len());

        for values in columns {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            if present.is_empty() {
                mean.push(0.0);
                std.push(1.0);
                continue;
            }
            let n = present.len() as f64;
            let m = present.iter().sum::<f64>() / n;
            let var = present.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
            let s = var.sqrt();
            mean.push(m);
            std.push(if s > 0.0 { s } else { 1.0 });
        }

        Scaler { mean, std }
    }

    /// Scale one cell of column `c`. Missing cells are imputed with the fitted
    /// mean, i.e. they scale to 0.0.
    pub fn transform_value(&self, c: usize, value: Option<f64>) -> f64 {
        match value {
            Some(v) => (v - self.mean[c]) / self.std[c],
            None => 0.0,
        }
    }
}

/// Vocabulary of a one-hot encoded column, sorted lexicographically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotBlock {
    pub column: String,
    pub categories: Vec<String>,
}

impl OneHotBlock {
    fn position(&self, value: Option<&str>) -> Option<usize> {
        let value = value?;
        self.categories.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    pub categorical_columns: Vec<String>,
    pub label_column: String,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            label_column: LABEL_COLUMN.to_string(),
        }
    }
}

/// Unfitted preprocessor.
#[derive(Clone, Debug, Default)]
pub struct FeaturePreprocessor {
    config: PreprocessorConfig,
}

impl FeaturePreprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        FeaturePreprocessor { config }
    }

    pub fn with_label(label_column: &str) -> Self {
        FeaturePreprocessor::new(PreprocessorConfig {
            label_column: label_column.to_string(),
            ..PreprocessorConfig::default()
        })
    }

    /// Learn category vocabularies and numeric statistics from `dataset`.
    ///
    /// # Errors
    ///
    /// `SchemaError` if the label column is declared categorical, a declared
    /// categorical column is missing, or a remaining feature column is not
    /// numeric.
    pub fn fit(&self, dataset: &TrainingDataset) -> Result<FittedTransform> {
        let label = self.config.label_column.as_str();
        if self.config.categorical_columns.iter().any(|c| c == label) {
            return Err(NutriError::Schema(format!(
                "label column '{}' cannot be used as a feature",
                label
            )));
        }

        let mut categorical = Vec::with_capacity(self.config.categorical_columns.len());
        for name in &self.config.categorical_columns {
            let column = dataset.column(name).ok_or_else(|| {
                NutriError::Schema(format!("categorical column '{}' not found in dataset", name))
            })?;
            let categories: BTreeSet<String> = match &column.data {
                ColumnData::Text(values) => values.iter().flatten().cloned().collect(),
                ColumnData::Numeric(values) => {
                    values.iter().flatten().map(|v| v.to_string()).collect()
                }
            };
            categorical.push(OneHotBlock {
                column: name.clone(),
                categories: categories.into_iter().collect(),
            });
        }

        let mut numeric_columns = Vec::new();
        let mut numeric_values: Vec<&[Option<f64>]> = Vec::new();
        for column in dataset.columns() {
            if column.name == label || self.config.categorical_columns.contains(&column.name) {
                continue;
            }
            match &column.data {
                ColumnData::Numeric(values) => {
                    numeric_columns.push(column.name.clone());
                    numeric_values.push(values);
                }
                ColumnData::Text(_) => {
                    return Err(NutriError::Schema(format!(
                        "column '{}' is neither declared categorical nor numeric",
                        column.name
                    )))
                }
            }
        }

        let scaler = Scaler::fit(&numeric_values);
        let fitted = FittedTransform {
            categorical,
            numeric_columns,
            scaler,
        };
        log::debug!(
            "Fitted preprocessor: {} output features from {} rows",
            fitted.n_features(),
            dataset.n_rows()
        );
        Ok(fitted)
    }
}

/// Frozen preprocessing state produced by `FeaturePreprocessor::fit`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    categorical: Vec<OneHotBlock>,
    numeric_columns: Vec<String>,
    scaler: Scaler,
}

impl FittedTransform {
    pub fn n_features(&self) -> usize {
        self.categorical.iter().map(|b| b.categories.len()).sum::<usize>()
            + self.numeric_columns.len()
    }

    /// Output column names: `<column>_<category>` for one-hot blocks followed
    /// by the numeric column names.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_features());
        for block in &self.categorical {
            for category in &block.categories {
                names.push(format!("{}_{}", block.column, category));
            }
        }
        names.extend(self.numeric_columns.iter().cloned());
        names
    }

    pub fn categorical_blocks(&self) -> &[OneHotBlock] {
        &self.categorical
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    /// Encode `dataset` into a dense feature matrix (rows = records).
    ///
    /// Unseen or missing categories produce an all-zero block. Columns not
    /// seen during fitting are ignored.
    pub fn transform(&self, dataset: &TrainingDataset) -> Result<Array2<f64>> {
        let n_rows = dataset.n_rows();
        let mut x = Array2::<f64>::zeros((n_rows, self.n_features()));
        let mut offset = 0;

        for block in &self.categorical {
            let column = dataset.column(&block.column).ok_or_else(|| {
                NutriError::Schema(format!("column '{}' missing at transform time", block.column))
            })?;
            for row in 0..n_rows {
                let cell = match &column.data {
                    ColumnData::Text(values) => values[row].clone(),
                    ColumnData::Numeric(values) => values[row].map(|v| v.to_string()),
                };
                if let Some(pos) = block.position(cell.as_deref()) {
                    x[[row, offset + pos]] = 1.0;
                }
            }
            offset += block.categories.len();
        }

        for (c, name) in self.numeric_columns.iter().enumerate() {
            let values = match dataset.column(name).map(|col| &col.data) {
                Some(ColumnData::Numeric(values)) => values,
                Some(ColumnData::Text(_)) => {
                    return Err(NutriError::Schema(format!(
                        "column '{}' was numeric at fit time but holds text",
                        name
                    )))
                }
                None => {
                    return Err(NutriError::Schema(format!(
                        "column '{}' missing at transform time",
                        name
                    )))
                }
            };
            for (row, value) in values.iter().enumerate() {
                x[[row, offset + c]] = self.scaler.transform_value(c, *value);
            }
        }

        Ok(x)
    }
}
