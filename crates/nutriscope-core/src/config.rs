use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::data_handling::LABEL_COLUMN;
use crate::error::{NutriError, Result};

/// Number of candidate features examined at each forest split.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
    Count(usize),
}

impl MaxFeatures {
    /// Resolve against the number of input features (always at least 1).
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Sqrt => n.sqrt() as usize,
            MaxFeatures::Log2 => n.log2() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(k) => *k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    RandomForest {
        n_estimators: usize,
        /// `None` grows trees until leaves are pure.
        max_depth: Option<usize>,
        min_samples_split: usize,
        max_features: MaxFeatures,
    },
    GBDT {
        learning_rate: f32,
        max_depth: u32,
        num_boost_round: u32,
        debug: bool,
        training_optimization_level: u8,
        loss_type: String,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::RandomForest {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

impl ModelType {
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::RandomForest { .. } => "random_forest",
            ModelType::GBDT { .. } => "gbdt",
        }
    }

    /// Number of trees in the ensemble.
    pub fn n_trees(&self) -> usize {
        match self {
            ModelType::RandomForest { n_estimators, .. } => *n_estimators,
            ModelType::GBDT { num_boost_round, .. } => *num_boost_round as usize,
        }
    }

    /// Override the number of trees in the ensemble.
    pub fn with_n_trees(mut self, n: usize) -> Self {
        match &mut self {
            ModelType::RandomForest { n_estimators, .. } => *n_estimators = n,
            ModelType::GBDT { num_boost_round, .. } => *num_boost_round = n as u32,
        }
        self
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random_forest" | "rf" => Ok(ModelType::default()),
            "gbdt" => Ok(ModelType::GBDT {
                learning_rate: 0.1,
                max_depth: 6,
                num_boost_round: 50,
                debug: false,
                training_optimization_level: 2,
                loss_type: "LogLikelyhood".to_string(),
            }),
            _ => Err(format!(
                "Unknown model type: {}. Expected one of: random_forest, gbdt",
                s
            )),
        }
    }
}

/// Parameters of a training and evaluation run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    pub target_column: String,
    /// Fraction of rows held out for evaluation, in (0, 1).
    pub test_fraction: f64,
    /// Number of stratified cross-validation folds, at least 2.
    pub cv_folds: usize,
    /// Seed for the split, the folds and the classifier.
    pub seed: u64,
    pub model: ModelType,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            target_column: LABEL_COLUMN.to_string(),
            test_fraction: 0.2,
            cv_folds: 5,
            seed: 42,
            model: ModelType::default(),
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(NutriError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.cv_folds < 2 {
            return Err(NutriError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.model.n_trees() == 0 {
            return Err(NutriError::Config(
                "the ensemble needs at least one tree".to_string(),
            ));
        }
        Ok(())
    }
}
