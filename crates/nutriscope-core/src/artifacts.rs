//! On-disk outputs of a training run.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::pipeline::FittedPipeline;
use crate::report::{CrossValidationSummary, EvaluationReport};
use crate::trainer::{HeldOutPredictions, TrainingRun};

pub const MODEL_FILE: &str = "nutriscope_model.json";
pub const PREDICTIONS_FILE: &str = "risk_predictions.csv";
pub const KEY_FINDINGS_FILE: &str = "key_findings.csv";
pub const CLASSIFICATION_REPORT_FILE: &str = "classification_report.txt";
pub const CV_SUMMARY_FILE: &str = "cv_summary.csv";

/// Writes training artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open `dir` as an artifact store, creating it if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        Ok(ArtifactStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn save_pipeline(&self, pipeline: &FittedPipeline) -> Result<PathBuf> {
        let path = self.path(MODEL_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create model file: {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), pipeline)
            .with_context(|| format!("Failed to serialize model: {}", path.display()))?;
        Ok(path)
    }

    /// Restore a pipeline written by `save_pipeline`.
    pub fn load_pipeline<P: AsRef<Path>>(path: P) -> Result<FittedPipeline> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file: {}", path.display()))?;
        let pipeline = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse model file: {}", path.display()))?;
        Ok(pipeline)
    }

    /// Held-out rows followed by `true_label`, `predicted_label` and
    /// `predicted_proba`.
    pub fn write_predictions(&self, predictions: &HeldOutPredictions) -> Result<PathBuf> {
        let path = self.path(PREDICTIONS_FILE);
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create predictions file: {}", path.display()))?;

        let columns = predictions.features.columns();
        let mut header: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        header.extend(["true_label", "predicted_label", "predicted_proba"]);
        wtr.write_record(&header)?;

        for row in 0..predictions.len() {
            let mut record: Vec<String> = columns.iter().map(|c| c.data.cell_to_string(row)).collect();
            record.push(predictions.true_labels[row].to_string());
            record.push(predictions.predicted_labels[row].to_string());
            record.push(predictions.predicted_proba[row].to_string());
            wtr.write_record(&record)?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to write predictions: {}", path.display()))?;
        Ok(path)
    }

    /// `metric,value` table; an undefined ROC-AUC is written as an empty value.
    pub fn write_key_findings(&self, report: &EvaluationReport) -> Result<PathBuf> {
        let path = self.path(KEY_FINDINGS_FILE);
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create key findings file: {}", path.display()))?;
        wtr.write_record(["metric", "value"])?;
        for (metric, value) in report.key_metrics() {
            let value = value.map(|v| v.to_string()).unwrap_or_default();
            wtr.write_record([metric, value.as_str()])?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to write key findings: {}", path.display()))?;
        Ok(path)
    }

    pub fn write_classification_report(&self, report: &EvaluationReport) -> Result<PathBuf> {
        let path = self.path(CLASSIFICATION_REPORT_FILE);
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        file.write_all(report.classification_report.as_bytes())
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(path)
    }

    pub fn write_cv_summary(&self, summary: &CrossValidationSummary) -> Result<PathBuf> {
        let path = self.path(CV_SUMMARY_FILE);
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create CV summary file: {}", path.display()))?;
        wtr.write_record(["cv_metric", "value"])?;
        for (metric, value) in summary.rows() {
            wtr.write_record([metric, value.to_string().as_str()])?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to write CV summary: {}", path.display()))?;
        Ok(path)
    }

    /// Delete a CV summary left by an earlier run in the same directory.
    pub fn remove_cv_summary(&self) -> Result<()> {
        let path = self.path(CV_SUMMARY_FILE);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed stale {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Write every artifact of `run`. When cross-validation did not run, no
    /// CV summary is written and any older one is removed.
    pub fn save_all(&self, run: &TrainingRun) -> Result<()> {
        let model_path = self.save_pipeline(&run.pipeline)?;
        log::info!("Saved model to {}", model_path.display());
        self.write_predictions(&run.predictions)?;
        self.write_key_findings(&run.report)?;
        self.write_classification_report(&run.report)?;
        match &run.report.cross_validation {
            Some(cv) => {
                self.write_cv_summary(cv)?;
            }
            None => {
                log::warn!("No cross-validation summary; {} not written", CV_SUMMARY_FILE);
                self.remove_cv_summary()?;
            }
        }
        log::info!("Artifacts written to {}", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FoldScore;

    fn report(roc_auc: Option<f64>) -> EvaluationReport {
        EvaluationReport {
            accuracy: 0.75,
            f1: 0.5,
            roc_auc,
            per_class: Vec::new(),
            classification_report: "report\n".to_string(),
            cross_validation: None,
        }
    }

    #[test]
    fn key_findings_leave_missing_auc_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("out")).unwrap();
        let path = store.write_key_findings(&report(None)).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "metric,value\naccuracy,0.75\nf1,0.5\nroc_auc,\n");

        store.write_key_findings(&report(Some(0.9))).unwrap();
        let text = fs::read_to_string(store.path(KEY_FINDINGS_FILE)).unwrap();
        assert!(text.ends_with("roc_auc,0.9\n"));
    }

    #[test]
    fn cv_summary_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let summary = CrossValidationSummary::from_folds(vec![
            FoldScore { fold: 0, accuracy: 1.0, f1: 1.0 },
            FoldScore { fold: 1, accuracy: 1.0, f1: 1.0 },
        ])
        .unwrap();
        store.write_cv_summary(&summary).unwrap();
        let text = fs::read_to_string(store.path(CV_SUMMARY_FILE)).unwrap();
        assert_eq!(
            text,
            "cv_metric,value\naccuracy_mean,1\naccuracy_std,0\nf1_mean,1\nf1_std,0\n"
        );
    }

    #[test]
    fn stale_cv_summary_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        store.remove_cv_summary().unwrap();

        fs::write(store.path(CV_SUMMARY_FILE), "cv_metric,value\n").unwrap();
        store.remove_cv_summary().unwrap();
        assert!(!store.path(CV_SUMMARY_FILE).exists());
    }

    #[test]
    fn load_missing_model_reports_path() {
        let err = ArtifactStore::load_pipeline("/nonexistent/nutriscope_model.json").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/nutriscope_model.json"));
    }
}
