use ndarray::Array2;

use crate::error::Result;

/// Contract shared by the tree-ensemble classifiers. Labels are 0/1 with 1
/// meaning "at risk of hidden hunger".
pub trait ClassifierModel {
    /// Fit the model on a standardized feature matrix.
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()>;

    /// Predict hard 0/1 labels.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>>;

    /// Predict class-1 probabilities, or `None` for models without a
    /// probabilistic output.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Vec<f64>>>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
