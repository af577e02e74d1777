pub mod assess;
pub mod input;
