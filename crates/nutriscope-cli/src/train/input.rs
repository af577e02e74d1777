use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use nutriscope_core::config::{ModelType, TrainerConfig};

use crate::util::validate_tsv_or_csv_file;

/// Training run parameters: where the data lives, where artifacts go, and the
/// trainer settings (flattened, so they sit at the top level of the JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainRunConfig {
    pub train_data: String,
    pub output_dir: String,
    #[serde(flatten)]
    pub trainer: TrainerConfig,
}

impl Default for TrainRunConfig {
    fn default() -> Self {
        TrainRunConfig {
            train_data: String::new(),
            output_dir: String::from("nutriscope_output"),
            trainer: TrainerConfig::default(),
        }
    }
}

/// Values given on the command line that replace those in the config file.
#[derive(Debug, Clone, Default)]
pub struct TrainOverrides {
    pub train_data: Option<String>,
    pub output_dir: Option<String>,
    pub model_type: Option<String>,
    pub seed: Option<u64>,
    pub n_estimators: Option<usize>,
}

impl TrainOverrides {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        TrainOverrides {
            train_data: matches.get_one::<String>("train_data").cloned(),
            output_dir: matches.get_one::<String>("output_dir").cloned(),
            model_type: matches.get_one::<String>("model_type").cloned(),
            seed: matches.get_one::<u64>("seed").copied(),
            n_estimators: matches.get_one::<usize>("n_estimators").copied(),
        }
    }
}

/// Load a training configuration from a JSON file. Missing keys take their
/// defaults.
pub fn load_train_config<P: AsRef<Path>>(path: P) -> Result<TrainRunConfig> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: TrainRunConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

impl TrainRunConfig {
    pub fn from_arguments<P: AsRef<Path>>(config_path: P, matches: &ArgMatches) -> Result<Self> {
        let mut config = load_train_config(config_path)?;
        config.apply_overrides(&TrainOverrides::from_matches(matches))?;
        Ok(config)
    }

    /// Apply CLI overrides, then check the training file and trainer settings.
    /// The model type is replaced before the tree count so both can be given
    /// together.
    pub fn apply_overrides(&mut self, overrides: &TrainOverrides) -> Result<()> {
        if let Some(train_data) = &overrides.train_data {
            self.train_data = train_data.clone();
        }
        validate_tsv_or_csv_file(&self.train_data)?;

        if let Some(output_dir) = &overrides.output_dir {
            self.output_dir = output_dir.clone();
        }
        if let Some(model_type) = &overrides.model_type {
            self.trainer.model = ModelType::from_str(model_type).map_err(anyhow::Error::msg)?;
        }
        if let Some(n_estimators) = overrides.n_estimators {
            self.trainer.model = self.trainer.model.clone().with_n_trees(n_estimators);
        }
        if let Some(seed) = overrides.seed {
            self.trainer.seed = seed;
        }

        self.trainer.validate()?;
        Ok(())
    }
}
