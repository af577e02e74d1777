use std::fmt;

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::error::{NutriError, Result};
use crate::models::classifier_trait::ClassifierModel;

/// Gradient Boosting Decision Tree (GBDT) classifier
#[derive(Serialize, Deserialize)]
pub struct GBDTClassifier {
    model: Option<GBDT>,
    params: ModelType,
}

impl fmt::Debug for GBDTClassifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GBDTClassifier")
            .field("params", &self.params)
            .field("fitted", &self.model.is_some())
            .finish()
    }
}

impl GBDTClassifier {
    pub fn new(params: ModelType) -> Self {
        GBDTClassifier {
            model: None,
            params,
        }
    }

    fn to_data(x: &Array2<f64>, labels: Option<&[u8]>) -> DataVec {
        let mut data = DataVec::new();
        for (i, row) in x.outer_iter().enumerate() {
            let features = row.iter().map(|&v| v as f32).collect::<Vec<f32>>();
            // LogLikelyhood expects labels in {-1, 1}
            let label = match labels {
                Some(y) if y[i] == 1 => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            };
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        data
    }

    fn probabilities(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        let model = self.model.as_ref().ok_or(NutriError::NotFitted("GBDT"))?;
        let test_x = Self::to_data(x, None);
        Ok(model.predict(&test_x).into_iter().map(|p| p as f64).collect())
    }
}

impl ClassifierModel for GBDTClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        match &self.params {
            ModelType::GBDT {
                learning_rate,
                max_depth,
                num_boost_round,
                debug,
                training_optimization_level,
                loss_type,
            } => {
                if x.nrows() == 0 || y.len() != x.nrows() {
                    return Err(NutriError::Data(format!(
                        "cannot fit GBDT on {} rows with {} labels",
                        x.nrows(),
                        y.len()
                    )));
                }

                let mut config = Config::new();
                config.set_feature_size(x.ncols());
                config.set_shrinkage(*learning_rate);
                config.set_max_depth(*max_depth);
                config.set_iterations(*num_boost_round as usize);
                config.set_debug(*debug);
                config.set_training_optimization_level(*training_optimization_level);
                config.set_loss(loss_type);
                // Full samples keep the fit deterministic.
                config.set_data_sample_ratio(1.0);
                config.set_feature_sample_ratio(1.0);

                let mut gbdt = GBDT::new(&config);
                let mut train_x = Self::to_data(x, Some(y));
                gbdt.fit(&mut train_x);

                self.model = Some(gbdt);
                Ok(())
            }
            other => Err(NutriError::Config(format!(
                "expected GBDT params, got {}",
                other.name()
            ))),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        Ok(self
            .probabilities(x)?
            .into_iter()
            .map(|p| u8::from(p > 0.5))
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Vec<f64>>> {
        self.probabilities(x).map(Some)
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}
