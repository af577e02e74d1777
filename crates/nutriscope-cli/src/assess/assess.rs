use std::fmt::Write as _;

use anyhow::{Context, Result};

use nutriscope_core::io::load_reference_dataset;
use nutriscope_core::scorer::RiskAssessment;
use nutriscope_core::sink::{AssessmentOutcome, Assessor, JsonLinesSink};
use nutriscope_core::stats::ReferenceStatistics;

use crate::assess::input::AssessArgs;
use crate::util::validate_tsv_or_csv_file;

/// Score one record against the reference dataset, forwarding the result to
/// the JSON-lines sink when one is given.
pub fn run_assessment(args: &AssessArgs) -> Result<AssessmentOutcome> {
    let record = args.to_record()?;

    let reference = args.reference.to_string_lossy();
    validate_tsv_or_csv_file(&reference)?;
    let dataset = load_reference_dataset(&args.reference)
        .with_context(|| format!("Failed to load reference data: {}", reference))?;
    let stats = ReferenceStatistics::from_dataset(&dataset)?;

    let assessor = match &args.sink {
        Some(path) => Assessor::with_sink(stats, Box::new(JsonLinesSink::open(path)?)),
        None => Assessor::new(stats),
    };
    Ok(assessor.assess(&record)?)
}

/// Human-readable summary of an assessment.
pub fn render_assessment(assessment: &RiskAssessment) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Hidden hunger risk score: {:.2} ({} risk)",
        assessment.risk_score, assessment.risk_category
    );
    let _ = writeln!(
        out,
        "Average intake: {:.1}% of population mean",
        assessment.average_ratio * 100.0
    );
    for feedback in &assessment.per_nutrient_feedback {
        let _ = writeln!(out, "  {}", feedback.message());
    }
    out
}
