use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use nutriscope_core::artifacts::{
    ArtifactStore, CLASSIFICATION_REPORT_FILE, CV_SUMMARY_FILE, KEY_FINDINGS_FILE, MODEL_FILE,
    PREDICTIONS_FILE,
};
use nutriscope_core::config::{ModelType, TrainerConfig};
use nutriscope_core::data_handling::{
    EducationLevel, Gender, IncomeBracket, NutrientIntake, NutrientRecord, TrainingDataset,
};
use nutriscope_core::io::load_training_dataset;
use nutriscope_core::trainer::train_and_evaluate;
use nutriscope_core::NutriError;

const HEADER: &str = "Age,Gender,Income_Bracket,Education_Level,Vitamin_A_Intake_ug,\
Vitamin_D_Intake_IU,Zinc_Intake_mg,Iron_Intake_mg,Folate_Intake_ug,Hidden_Hunger_Flag";

/// Rows where every third person eats roughly a third of the others.
fn write_dataset(path: &Path, n_rows: usize, all_label: Option<u8>) {
    let genders = ["Male", "Female"];
    let incomes = ["low", "lower_middle", "upper_middle", "high"];
    let education = ["primary", "secondary", "tertiary"];

    let mut text = String::from(HEADER);
    text.push('\n');
    for i in 0..n_rows {
        let at_risk = all_label.unwrap_or(u8::from(i % 3 == 0));
        let scale = if at_risk == 1 { 0.3 } else { 1.0 } + (i % 5) as f64 * 0.02;
        writeln!(
            text,
            "{},{},{},{},{:.1},{:.1},{:.2},{:.2},{:.1},{}",
            20 + i % 40,
            genders[i % 2],
            incomes[i % 4],
            education[i % 3],
            700.0 * scale,
            600.0 * scale,
            10.0 * scale,
            14.0 * scale,
            400.0 * scale,
            at_risk
        )
        .unwrap();
    }
    fs::write(path, text).unwrap();
}

fn small_config() -> TrainerConfig {
    TrainerConfig {
        model: ModelType::default().with_n_trees(25),
        ..TrainerConfig::default()
    }
}

#[test]
fn train_evaluate_and_persist() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("hidden_hunger.csv");
    write_dataset(&data_path, 60, None);

    let dataset = load_training_dataset(&data_path).unwrap();
    let run = train_and_evaluate(&dataset, &small_config()).unwrap();

    assert_eq!(run.predictions.len(), 12);
    assert!(run.report.accuracy > 0.9);
    assert!(run.report.roc_auc.is_some());
    assert!(run
        .predictions
        .predicted_proba
        .iter()
        .all(|p| (0.0..=1.0).contains(p)));
    assert!(!run.predictions.features.has_column("Hidden_Hunger_Flag"));
    assert_eq!(run.report.cross_validation.as_ref().unwrap().folds.len(), 5);

    let store = ArtifactStore::new(dir.path().join("artifacts")).unwrap();
    store.save_all(&run).unwrap();
    for file in [
        MODEL_FILE,
        PREDICTIONS_FILE,
        KEY_FINDINGS_FILE,
        CLASSIFICATION_REPORT_FILE,
        CV_SUMMARY_FILE,
    ] {
        assert!(store.path(file).exists(), "missing {}", file);
    }

    let predictions = fs::read_to_string(store.path(PREDICTIONS_FILE)).unwrap();
    let header = predictions.lines().next().unwrap();
    assert!(header.starts_with("Age,Gender,Income_Bracket,Education_Level"));
    assert!(header.ends_with("true_label,predicted_label,predicted_proba"));
    assert_eq!(predictions.lines().count(), 13);

    let reloaded = ArtifactStore::load_pipeline(store.path(MODEL_FILE)).unwrap();
    assert_eq!(
        reloaded.predict(&run.predictions.features).unwrap(),
        run.predictions.predicted_labels
    );
    assert_eq!(reloaded.feature_names(), run.pipeline.feature_names());
}

#[test]
fn cross_validation_is_deterministic_for_a_seed() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("hidden_hunger.csv");
    write_dataset(&data_path, 45, None);
    let dataset = load_training_dataset(&data_path).unwrap();

    let first = train_and_evaluate(&dataset, &small_config()).unwrap();
    let second = train_and_evaluate(&dataset, &small_config()).unwrap();
    let (a, b) = (
        first.report.cross_validation.unwrap(),
        second.report.cross_validation.unwrap(),
    );
    assert_eq!(a.accuracy_mean.to_bits(), b.accuracy_mean.to_bits());
    assert_eq!(a.accuracy_std.to_bits(), b.accuracy_std.to_bits());
    assert_eq!(a.f1_mean.to_bits(), b.f1_mean.to_bits());
    assert_eq!(a.f1_std.to_bits(), b.f1_std.to_bits());
    assert_eq!(first.predictions.predicted_proba, second.predictions.predicted_proba);
}

#[test]
fn single_class_holdout_omits_roc_auc() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("all_healthy.csv");
    write_dataset(&data_path, 20, Some(0));
    let dataset = load_training_dataset(&data_path).unwrap();

    let run = train_and_evaluate(&dataset, &small_config()).unwrap();
    assert!(run.report.roc_auc.is_none());
    assert_eq!(run.report.accuracy, 1.0);
    assert_eq!(run.report.f1, 0.0);

    let store = ArtifactStore::new(dir.path()).unwrap();
    store.write_key_findings(&run.report).unwrap();
    let findings = fs::read_to_string(store.path(KEY_FINDINGS_FILE)).unwrap();
    assert!(findings.ends_with("roc_auc,\n"));
}

#[test]
fn too_few_rows_for_cv_still_trains() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("tiny.csv");
    write_dataset(&data_path, 9, None);
    let dataset = load_training_dataset(&data_path).unwrap();

    let config = TrainerConfig {
        cv_folds: 10,
        ..small_config()
    };
    let run = train_and_evaluate(&dataset, &config).unwrap();
    assert!(run.report.cross_validation.is_none());
}

#[test]
fn rerun_without_cv_drops_old_summary() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path().join("artifacts")).unwrap();

    let full_path = dir.path().join("full.csv");
    write_dataset(&full_path, 45, None);
    let full = train_and_evaluate(&load_training_dataset(&full_path).unwrap(), &small_config()).unwrap();
    store.save_all(&full).unwrap();
    assert!(store.path(CV_SUMMARY_FILE).exists());

    let tiny_path = dir.path().join("tiny.csv");
    write_dataset(&tiny_path, 9, None);
    let config = TrainerConfig {
        cv_folds: 10,
        ..small_config()
    };
    let tiny = train_and_evaluate(&load_training_dataset(&tiny_path).unwrap(), &config).unwrap();
    store.save_all(&tiny).unwrap();
    assert!(!store.path(CV_SUMMARY_FILE).exists());
    assert!(store.path(MODEL_FILE).exists());
}

#[test]
fn infinite_intake_fails_loading() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("hidden_hunger.csv");
    write_dataset(&data_path, 40, None);
    let text = fs::read_to_string(&data_path).unwrap();
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut cells: Vec<String> = lines[3].split(',').map(str::to_string).collect();
    cells[4] = "inf".to_string();
    lines[3] = cells.join(",");
    fs::write(&data_path, lines.join("\n")).unwrap();

    assert!(matches!(
        load_training_dataset(&data_path),
        Err(NutriError::Data(ref msg)) if msg.contains("Vitamin_A_Intake_ug")
    ));
}

#[test]
fn missing_target_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("hidden_hunger.csv");
    write_dataset(&data_path, 20, None);
    let dataset = load_training_dataset(&data_path).unwrap();

    let config = TrainerConfig {
        target_column: "Anemia_Flag".to_string(),
        ..small_config()
    };
    assert!(matches!(
        train_and_evaluate(&dataset, &config),
        Err(NutriError::Schema(_))
    ));

    let bad_fraction = TrainerConfig {
        test_fraction: 1.0,
        ..small_config()
    };
    assert!(matches!(
        train_and_evaluate(&dataset, &bad_fraction),
        Err(NutriError::Config(_))
    ));
}

#[test]
fn fitted_pipeline_predicts_new_records() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("hidden_hunger.csv");
    write_dataset(&data_path, 60, None);
    let dataset = load_training_dataset(&data_path).unwrap();
    let run = train_and_evaluate(&dataset, &small_config()).unwrap();

    let deficient = NutrientRecord::new(
        30,
        Gender::Female,
        IncomeBracket::Low,
        EducationLevel::Primary,
        NutrientIntake {
            vitamin_a_ug: 200.0,
            vitamin_d_iu: 180.0,
            zinc_mg: 3.0,
            iron_mg: 4.0,
            folate_ug: 120.0,
        },
    )
    .unwrap();
    let (label, proba) = run.pipeline.predict_record(&deficient).unwrap();
    assert_eq!(label, 1);
    assert!(proba > 0.5);

    let batch = TrainingDataset::from_records(&[deficient], None).unwrap();
    assert_eq!(run.pipeline.predict(&batch).unwrap(), vec![1]);
}
