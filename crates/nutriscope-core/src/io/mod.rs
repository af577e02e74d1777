//! Tabular dataset readers.
pub mod dataset_csv;

pub use dataset_csv::{
    load_reference_dataset, load_training_dataset, read_dataset_from_reader,
    read_dataset_with_config, DatasetReaderConfig,
};
