use std::error::Error;
use std::fmt;

use crate::data_handling::Nutrient;

/// Errors raised while validating inputs, loading datasets, fitting or scoring.
#[derive(Debug)]
pub enum NutriError {
    /// Malformed or out-of-range assessment input.
    Validation(String),
    /// Dataset is empty, lacks a required column, or holds unusable values.
    Data(String),
    /// Declared schema does not match the dataset seen during fit/transform.
    Schema(String),
    /// Reference mean is zero or undefined, so the intake ratio cannot be formed.
    Division { nutrient: Nutrient, mean: f64 },
    /// Trainer configuration is out of range.
    Config(String),
    /// A model was asked to predict before being fitted.
    NotFitted(&'static str),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NutriError>;

impl fmt::Display for NutriError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NutriError::Validation(msg) => write!(f, "Invalid input record: {}", msg),
            NutriError::Data(msg) => write!(f, "Data error: {}", msg),
            NutriError::Schema(msg) => write!(f, "Schema error: {}", msg),
            NutriError::Division { nutrient, mean } => write!(
                f,
                "Cannot compute {} ratio: reference mean is {}",
                nutrient.display_name(),
                mean
            ),
            NutriError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            NutriError::NotFitted(model) => write!(f, "{} must be fitted before use", model),
            NutriError::Io(e) => write!(f, "I/O error: {}", e),
            NutriError::Csv(e) => write!(f, "CSV error: {}", e),
            NutriError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl Error for NutriError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NutriError::Io(e) => Some(e),
            NutriError::Csv(e) => Some(e),
            NutriError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NutriError {
    fn from(e: std::io::Error) -> Self {
        NutriError::Io(e)
    }
}

impl From<csv::Error> for NutriError {
    fn from(e: csv::Error) -> Self {
        NutriError::Csv(e)
    }
}

impl From<serde_json::Error> for NutriError {
    fn from(e: serde_json::Error) -> Self {
        NutriError::Json(e)
    }
}
