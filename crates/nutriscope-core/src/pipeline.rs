//! The composed preprocess + classify pipeline persisted after training.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::data_handling::{NutrientRecord, TrainingDataset};
use crate::error::{NutriError, Result};
use crate::models::{build_model, Classifier, ClassifierModel};
use crate::preprocessing::{FeaturePreprocessor, FittedTransform};

/// A fitted preprocessor and classifier. Only `FittedPipeline::fit` creates
/// one, so every instance is ready to predict.
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedPipeline {
    target_column: String,
    transform: FittedTransform,
    classifier: Classifier,
}

impl FittedPipeline {
    /// Fit preprocessing and classifier on `dataset`, which must contain the
    /// `target_column` labels.
    pub fn fit(
        dataset: &TrainingDataset,
        target_column: &str,
        model: &ModelType,
        seed: u64,
    ) -> Result<Self> {
        let y = dataset.labels(target_column)?;
        let transform = FeaturePreprocessor::with_label(target_column).fit(dataset)?;
        let x = transform.transform(dataset)?;

        let mut classifier = build_model(model, seed);
        classifier.fit(&x, &y)?;

        Ok(FittedPipeline {
            target_column: target_column.to_string(),
            transform,
            classifier,
        })
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.transform.feature_names()
    }

    pub fn transform(&self) -> &FittedTransform {
        &self.transform
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Hard 0/1 predictions. A label column in `dataset` is ignored.
    pub fn predict(&self, dataset: &TrainingDataset) -> Result<Vec<u8>> {
        let x = self.transform.transform(dataset)?;
        self.classifier.predict(&x)
    }

    /// Class-1 probabilities when the classifier provides them.
    pub fn predict_proba(&self, dataset: &TrainingDataset) -> Result<Option<Vec<f64>>> {
        let x = self.transform.transform(dataset)?;
        self.classifier.predict_proba(&x)
    }

    /// Labels and class-1 probabilities; probabilities fall back to zeros
    /// when the classifier has none.
    pub fn predict_with_probabilities(&self, dataset: &TrainingDataset) -> Result<(Vec<u8>, Vec<f64>)> {
        let x = self.transform.transform(dataset)?;
        let labels = self.classifier.predict(&x)?;
        let proba = probabilities_or_zeros(&self.classifier, &x)?;
        Ok((labels, proba))
    }

    /// Predict the label and class-1 probability of a single record.
    pub fn predict_record(&self, record: &NutrientRecord) -> Result<(u8, f64)> {
        let dataset = TrainingDataset::from_records(std::slice::from_ref(record), None)?;
        let (labels, proba) = self.predict_with_probabilities(&dataset)?;
        match (labels.first(), proba.first()) {
            (Some(&label), Some(&p)) => Ok((label, p)),
            _ => Err(NutriError::Data("no prediction produced for record".to_string())),
        }
    }
}

/// Class-1 probabilities of `model`, or an all-zero vector (with a warning)
/// when the model cannot produce probabilities.
pub fn probabilities_or_zeros<M: ClassifierModel + ?Sized>(model: &M, x: &Array2<f64>) -> Result<Vec<f64>> {
    match model.predict_proba(x)? {
        Some(proba) => Ok(proba),
        None => {
            log::warn!(
                "{} does not provide probabilities; using zeros for predicted_proba",
                model.name()
            );
            Ok(vec![0.0; x.nrows()])
        }
    }
}
