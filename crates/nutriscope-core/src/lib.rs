//! nutriscope-core: hidden hunger risk scoring and classifier training.
//!
//! Two independent paths share the dataset model:
//! - `scorer` turns one `NutrientRecord` into a `RiskAssessment` by comparing
//!   each intake with population means (`stats`), with `sink` forwarding the
//!   result to an optional record store.
//! - `trainer` fits a preprocessing + tree ensemble `pipeline` on a labelled
//!   dataset, evaluates it (`metrics`, `report`) and hands the run to
//!   `artifacts` for persistence.
pub mod artifacts;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod scorer;
pub mod sink;
pub mod stats;
pub mod trainer;

pub use error::{NutriError, Result};
