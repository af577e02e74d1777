use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use nutriscope_cli::assess::assess::{render_assessment, run_assessment};
use nutriscope_cli::assess::input::{assess_command, AssessArgs};
use nutriscope_cli::train::input::TrainRunConfig;
use nutriscope_cli::train::trainer;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(
            env_logger::Env::default()
                .filter_or("NUTRISCOPE_LOG", "error,nutriscope=info,nutriscope_core=info,nutriscope_cli=info"),
        )
        .init();

    let matches = Command::new("nutriscope")
        .version(clap::crate_version!())
        .about("NutriScope - hidden hunger risk assessment and classifier training")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train and evaluate the hidden hunger classifier")
                .arg(
                    Arg::new("config")
                        .help("Path to training configuration file (JSON)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('d')
                        .long("train_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to training data (*.csv or *.tsv). Overrides the training data \
                             file specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output_dir")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Directory the model and evaluation artifacts are written to. \
                             Overrides the directory specified in the configuration file.",
                        )
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("model_type")
                        .long("model-type")
                        .help("Override the model type from the JSON config.")
                        .value_parser(["random_forest", "gbdt"])
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("n_estimators")
                        .long("n-estimators")
                        .help("Number of trees (boosting rounds for gbdt).")
                        .value_parser(clap::value_parser!(usize))
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for the split, the folds and the classifier.")
                        .value_parser(clap::value_parser!(u64))
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(assess_command())
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("assess", sub_m)) => handle_assess(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .ok_or_else(|| anyhow::anyhow!("Missing configuration file"))?;
    log::info!("[NutriScope::Train] Training from config: {:?}", config_path);

    let params = TrainRunConfig::from_arguments(config_path, matches)?;

    match trainer::run_training(&params) {
        Ok(report) => {
            println!("accuracy\t{:.4}", report.accuracy);
            println!("f1\t{:.4}", report.f1);
            match report.roc_auc {
                Some(auc) => println!("roc_auc\t{:.4}", auc),
                None => println!("roc_auc\tNA"),
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_assess(matches: &ArgMatches) -> Result<()> {
    let args = AssessArgs::from_arguments(matches)?;

    match run_assessment(&args) {
        Ok(outcome) => {
            print!("{}", render_assessment(&outcome.assessment));
            if args.sink.is_some() && !outcome.persisted {
                eprintln!("[NutriScope::Assess] Warning: assessment was not saved to the record sink");
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Assessment failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
