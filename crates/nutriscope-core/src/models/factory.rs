use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gbdt::GBDTClassifier;
use crate::models::random_forest::RandomForestClassifier;

/// Any of the supported classifiers, in a form that can be persisted.
#[derive(Debug, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForestClassifier),
    GBDT(GBDTClassifier),
}

/// Build an unfitted classifier from a `ModelType`.
pub fn build_model(model_type: &ModelType, seed: u64) -> Classifier {
    match model_type {
        ModelType::RandomForest {
            n_estimators,
            max_depth,
            min_samples_split,
            max_features,
        } => Classifier::RandomForest(RandomForestClassifier::new(
            *n_estimators,
            *max_depth,
            *min_samples_split,
            *max_features,
            seed,
        )),
        ModelType::GBDT { .. } => Classifier::GBDT(GBDTClassifier::new(model_type.clone())),
    }
}

impl Classifier {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Classifier::RandomForest(m) => m,
            Classifier::GBDT(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Classifier::RandomForest(m) => m,
            Classifier::GBDT(m) => m,
        }
    }
}

impl ClassifierModel for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Vec<f64>>> {
        self.inner().predict_proba(x)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}
