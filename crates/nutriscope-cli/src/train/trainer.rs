use anyhow::{Context, Result};

use nutriscope_core::artifacts::ArtifactStore;
use nutriscope_core::io::load_training_dataset;
use nutriscope_core::report::EvaluationReport;
use nutriscope_core::trainer::train_and_evaluate;

use crate::train::input::TrainRunConfig;

/// Load the training data, fit and evaluate the classifier, and write every
/// artifact into `config.output_dir`.
pub fn run_training(config: &TrainRunConfig) -> Result<EvaluationReport> {
    log::info!(
        "Training {} ({} trees, seed {}) on {}",
        config.trainer.model.name(),
        config.trainer.model.n_trees(),
        config.trainer.seed,
        config.train_data
    );

    let dataset = load_training_dataset(&config.train_data)
        .with_context(|| format!("Failed to load training data: {}", config.train_data))?;
    let run = train_and_evaluate(&dataset, &config.trainer).context("Training failed")?;

    let store = ArtifactStore::new(&config.output_dir)?;
    store.save_all(&run)?;

    Ok(run.report)
}
