//! Record persistence for finished assessments.
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::data_handling::NutrientRecord;
use crate::error::Result;
use crate::scorer::{score, RiskAssessment};
use crate::stats::ReferenceStatistics;

/// Flat row persisted per assessment, keyed by the dataset column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Income_Bracket")]
    pub income_bracket: String,
    #[serde(rename = "Education_Level")]
    pub education_level: String,
    #[serde(rename = "Vitamin_A_Intake_ug")]
    pub vitamin_a_ug: f64,
    #[serde(rename = "Vitamin_D_Intake_IU")]
    pub vitamin_d_iu: f64,
    #[serde(rename = "Zinc_Intake_mg")]
    pub zinc_mg: f64,
    #[serde(rename = "Iron_Intake_mg")]
    pub iron_mg: f64,
    #[serde(rename = "Folate_Intake_ug")]
    pub folate_ug: f64,
    #[serde(rename = "Risk_Score")]
    pub risk_score: f64,
}

impl AssessmentRecord {
    pub fn new(record: &NutrientRecord, assessment: &RiskAssessment) -> Self {
        let intake = record.intake();
        AssessmentRecord {
            age: record.age(),
            gender: record.gender().as_str().to_string(),
            income_bracket: record.income_bracket().as_str().to_string(),
            education_level: record.education_level().as_str().to_string(),
            vitamin_a_ug: intake.vitamin_a_ug,
            vitamin_d_iu: intake.vitamin_d_iu,
            zinc_mg: intake.zinc_mg,
            iron_mg: intake.iron_mg,
            folate_ug: intake.folate_ug,
            risk_score: assessment.risk_score,
        }
    }
}

/// Append-only store for assessment records.
pub trait RecordSink: Send + Sync {
    fn insert(&self, record: &AssessmentRecord) -> anyhow::Result<()>;
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open record sink: {}", path.display()))?;
        Ok(JsonLinesSink {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonLinesSink {
    fn insert(&self, record: &AssessmentRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("record sink lock poisoned: {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        Ok(())
    }
}

/// Result of one assessment and whether it reached the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentOutcome {
    pub assessment: RiskAssessment,
    /// `false` when no sink is configured or the insert failed.
    pub persisted: bool,
}

/// Scores records against fixed reference statistics and forwards each
/// result to an optional sink.
pub struct Assessor {
    stats: ReferenceStatistics,
    sink: Option<Box<dyn RecordSink>>,
}

impl Assessor {
    pub fn new(stats: ReferenceStatistics) -> Self {
        Assessor { stats, sink: None }
    }

    pub fn with_sink(stats: ReferenceStatistics, sink: Box<dyn RecordSink>) -> Self {
        Assessor {
            stats,
            sink: Some(sink),
        }
    }

    pub fn stats(&self) -> &ReferenceStatistics {
        &self.stats
    }

    /// Score `record`. A sink failure is logged and reflected in
    /// `persisted`; it never changes the assessment.
    pub fn assess(&self, record: &NutrientRecord) -> Result<AssessmentOutcome> {
        let assessment = score(record, &self.stats)?;
        let persisted = match &self.sink {
            Some(sink) => match sink.insert(&AssessmentRecord::new(record, &assessment)) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Failed to persist assessment record: {:#}", e);
                    false
                }
            },
            None => false,
        };
        Ok(AssessmentOutcome {
            assessment,
            persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::{EducationLevel, Gender, IncomeBracket, Nutrient, NutrientIntake};

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn insert(&self, _record: &AssessmentRecord) -> anyhow::Result<()> {
            anyhow::bail!("store unavailable")
        }
    }

    fn stats() -> ReferenceStatistics {
        ReferenceStatistics::from_means(Nutrient::ALL.iter().map(|&n| (n, 10.0)))
    }

    fn record() -> NutrientRecord {
        NutrientRecord::new(
            34,
            Gender::Male,
            IncomeBracket::LowerMiddle,
            EducationLevel::Secondary,
            NutrientIntake {
                vitamin_a_ug: 5.0,
                vitamin_d_iu: 5.0,
                zinc_mg: 5.0,
                iron_mg: 5.0,
                folate_ug: 5.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn failing_sink_does_not_change_assessment() {
        let plain = Assessor::new(stats()).assess(&record()).unwrap();
        let failing = Assessor::with_sink(stats(), Box::new(FailingSink))
            .assess(&record())
            .unwrap();
        assert!(!failing.persisted);
        assert_eq!(plain.assessment, failing.assessment);
        assert_eq!(failing.assessment.risk_score, 0.5);
    }

    #[test]
    fn json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let assessor = Assessor::with_sink(stats(), Box::new(JsonLinesSink::open(&path).unwrap()));
        assert!(assessor.assess(&record()).unwrap().persisted);
        assert!(assessor.assess(&record()).unwrap().persisted);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let row: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(row["Age"], 34);
        assert_eq!(row["Income_Bracket"], "lower_middle");
        assert_eq!(row["Risk_Score"], 0.5);
    }
}
