use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};

use nutriscope_core::data_handling::{
    EducationLevel, Gender, IncomeBracket, NutrientIntake, NutrientRecord,
};

/// Arguments of a single-record assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessArgs {
    pub reference: PathBuf,
    pub age: u32,
    pub gender: String,
    pub income_bracket: String,
    pub education_level: String,
    pub intake: NutrientIntake,
    pub sink: Option<PathBuf>,
}

fn required<'a, T: Clone + Send + Sync + 'static>(matches: &'a ArgMatches, id: &str) -> Result<&'a T> {
    matches
        .get_one::<T>(id)
        .with_context(|| format!("Missing required argument --{}", id.replace('_', "-")))
}

fn intake_arg(id: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(long)
        .help(help)
        .required(true)
        .value_parser(clap::value_parser!(f64))
        .value_hint(ValueHint::Other)
}

/// The `assess` subcommand. Ages outside 1..=100 are rejected while parsing.
pub fn assess_command() -> Command {
    Command::new("assess")
        .about("Score one person's hidden hunger risk against a reference dataset")
        .arg(
            Arg::new("reference")
                .long("reference")
                .help("Reference dataset used for population mean intakes (*.csv or *.tsv)")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("age")
                .long("age")
                .help("Age in years")
                .required(true)
                .value_parser(clap::value_parser!(u32).range(1..=100)),
        )
        .arg(
            Arg::new("gender")
                .long("gender")
                .required(true)
                .value_parser(["Male", "Female"]),
        )
        .arg(
            Arg::new("income")
                .long("income")
                .help("Income bracket")
                .required(true)
                .value_parser(["low", "lower_middle", "upper_middle", "high"]),
        )
        .arg(
            Arg::new("education")
                .long("education")
                .help("Education level")
                .required(true)
                .value_parser(["primary", "secondary", "tertiary"]),
        )
        .arg(intake_arg("vitamin_a", "vitamin-a", "Vitamin A intake (ug/day)"))
        .arg(intake_arg("vitamin_d", "vitamin-d", "Vitamin D intake (IU/day)"))
        .arg(intake_arg("zinc", "zinc", "Zinc intake (mg/day)"))
        .arg(intake_arg("iron", "iron", "Iron intake (mg/day)"))
        .arg(intake_arg("folate", "folate", "Folate intake (ug/day)"))
        .arg(
            Arg::new("sink")
                .long("sink")
                .help("Append the assessment as a JSON line to this file")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
}

impl AssessArgs {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        Ok(AssessArgs {
            reference: required::<PathBuf>(matches, "reference")?.clone(),
            age: *required::<u32>(matches, "age")?,
            gender: required::<String>(matches, "gender")?.clone(),
            income_bracket: required::<String>(matches, "income")?.clone(),
            education_level: required::<String>(matches, "education")?.clone(),
            intake: NutrientIntake {
                vitamin_a_ug: *required::<f64>(matches, "vitamin_a")?,
                vitamin_d_iu: *required::<f64>(matches, "vitamin_d")?,
                zinc_mg: *required::<f64>(matches, "zinc")?,
                iron_mg: *required::<f64>(matches, "iron")?,
                folate_ug: *required::<f64>(matches, "folate")?,
            },
            sink: matches.get_one::<PathBuf>("sink").cloned(),
        })
    }

    /// Parse the categorical fields and build a validated record.
    pub fn to_record(&self) -> Result<NutrientRecord> {
        let record = NutrientRecord::new(
            self.age,
            Gender::from_str(&self.gender)?,
            IncomeBracket::from_str(&self.income_bracket)?,
            EducationLevel::from_str(&self.education_level)?,
            self.intake,
        )?;
        Ok(record)
    }
}
