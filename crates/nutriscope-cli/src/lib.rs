//! Command line front end for NutriScope: model training and single-record
//! hidden hunger assessment.
pub mod assess;
pub mod train;
pub mod util;
