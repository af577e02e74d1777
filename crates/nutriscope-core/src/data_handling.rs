//! Data structures for assessment inputs and tabular training data.
//!
//! This module defines the `NutrientRecord` submitted for a single risk
//! assessment, the closed set of tracked `Nutrient`s, and the column-oriented
//! `TrainingDataset` used by the reference statistics, the preprocessor and
//! the trainer. Datasets support row selection so splits and folds can be
//! carved out without copying the schema logic around.
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NutriError, Result};

pub const AGE_COLUMN: &str = "Age";
pub const GENDER_COLUMN: &str = "Gender";
pub const INCOME_BRACKET_COLUMN: &str = "Income_Bracket";
pub const EDUCATION_LEVEL_COLUMN: &str = "Education_Level";
pub const LABEL_COLUMN: &str = "Hidden_Hunger_Flag";

/// Columns that are one-hot encoded; every other non-label column is numeric.
pub const CATEGORICAL_COLUMNS: [&str; 3] =
    [GENDER_COLUMN, INCOME_BRACKET_COLUMN, EDUCATION_LEVEL_COLUMN];

/// The five micronutrients tracked by the risk scorer, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    VitaminA,
    VitaminD,
    Zinc,
    Iron,
    Folate,
}

impl Nutrient {
    pub const ALL: [Nutrient; 5] = [
        Nutrient::VitaminA,
        Nutrient::VitaminD,
        Nutrient::Zinc,
        Nutrient::Iron,
        Nutrient::Folate,
    ];

    /// Dataset column holding the intake of this nutrient.
    pub fn column_name(&self) -> &'static str {
        match self {
            Nutrient::VitaminA => "Vitamin_A_Intake_ug",
            Nutrient::VitaminD => "Vitamin_D_Intake_IU",
            Nutrient::Zinc => "Zinc_Intake_mg",
            Nutrient::Iron => "Iron_Intake_mg",
            Nutrient::Folate => "Folate_Intake_ug",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Nutrient::VitaminA => "Vitamin A",
            Nutrient::VitaminD => "Vitamin D",
            Nutrient::Zinc => "Zinc",
            Nutrient::Iron => "Iron",
            Nutrient::Folate => "Folate",
        }
    }

    /// Position of the nutrient in `Nutrient::ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeBracket {
    Low,
    LowerMiddle,
    UpperMiddle,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Primary,
    Secondary,
    Tertiary,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl IncomeBracket {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeBracket::Low => "low",
            IncomeBracket::LowerMiddle => "lower_middle",
            IncomeBracket::UpperMiddle => "upper_middle",
            IncomeBracket::High => "high",
        }
    }
}

impl EducationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::Primary => "primary",
            EducationLevel::Secondary => "secondary",
            EducationLevel::Tertiary => "tertiary",
        }
    }
}

impl FromStr for Gender {
    type Err = NutriError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(NutriError::Validation(format!("unknown gender '{}'", s))),
        }
    }
}

impl FromStr for IncomeBracket {
    type Err = NutriError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(IncomeBracket::Low),
            "lower_middle" => Ok(IncomeBracket::LowerMiddle),
            "upper_middle" => Ok(IncomeBracket::UpperMiddle),
            "high" => Ok(IncomeBracket::High),
            _ => Err(NutriError::Validation(format!("unknown income bracket '{}'", s))),
        }
    }
}

impl FromStr for EducationLevel {
    type Err = NutriError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(EducationLevel::Primary),
            "secondary" => Ok(EducationLevel::Secondary),
            "tertiary" => Ok(EducationLevel::Tertiary),
            _ => Err(NutriError::Validation(format!("unknown education level '{}'", s))),
        }
    }
}

/// Raw daily intakes, prior to validation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientIntake {
    pub vitamin_a_ug: f64,
    pub vitamin_d_iu: f64,
    pub zinc_mg: f64,
    pub iron_mg: f64,
    pub folate_ug: f64,
}

impl NutrientIntake {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::VitaminA => self.vitamin_a_ug,
            Nutrient::VitaminD => self.vitamin_d_iu,
            Nutrient::Zinc => self.zinc_mg,
            Nutrient::Iron => self.iron_mg,
            Nutrient::Folate => self.folate_ug,
        }
    }
}

/// One validated assessment request. Fields are private so a record can only
/// be obtained through `NutrientRecord::new`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientRecord {
    age: u32,
    gender: Gender,
    income_bracket: IncomeBracket,
    education_level: EducationLevel,
    intake: NutrientIntake,
}

impl NutrientRecord {
    /// Build a record, rejecting age 0 and NaN, infinite or negative intakes.
    ///
    /// Upper bounds (e.g. age above 100) are left to the caller's form validation.
    pub fn new(
        age: u32,
        gender: Gender,
        income_bracket: IncomeBracket,
        education_level: EducationLevel,
        intake: NutrientIntake,
    ) -> Result<Self> {
        if age < 1 {
            return Err(NutriError::Validation("age must be at least 1".to_string()));
        }
        for nutrient in Nutrient::ALL {
            let value = intake.get(nutrient);
            if !value.is_finite() {
                return Err(NutriError::Validation(format!(
                    "{} intake must be a finite number, got {}",
                    nutrient, value
                )));
            }
            if value < 0.0 {
                return Err(NutriError::Validation(format!(
                    "{} intake must be non-negative, got {}",
                    nutrient, value
                )));
            }
        }

        Ok(NutrientRecord {
            age,
            gender,
            income_bracket,
            education_level,
            intake,
        })
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn income_bracket(&self) -> IncomeBracket {
        self.income_bracket
    }

    pub fn education_level(&self) -> EducationLevel {
        self.education_level
    }

    pub fn intake(&self) -> &NutrientIntake {
        &self.intake
    }

    pub fn value(&self, nutrient: Nutrient) -> f64 {
        self.intake.get(nutrient)
    }
}

/// Cell storage for one dataset column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// Render a cell the way it is written back to CSV (missing → empty).
    pub fn cell_to_string(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
            ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<Option<f64>>) -> Self {
        Column {
            name: name.to_string(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: &str, values: Vec<Option<String>>) -> Self {
        Column {
            name: name.to_string(),
            data: ColumnData::Text(values),
        }
    }
}

/// Column-oriented table of (possibly labelled) records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingDataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl TrainingDataset {
    /// Assemble a dataset, checking that column names are unique and all
    /// columns have the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(NutriError::Data(format!("duplicate column '{}'", column.name)));
            }
            if column.data.len() != n_rows {
                return Err(NutriError::Data(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.data.len(),
                    n_rows
                )));
            }
        }
        Ok(TrainingDataset { columns, n_rows })
    }

    /// Build a dataset from validated records, optionally with labels in the
    /// `Hidden_Hunger_Flag` column.
    pub fn from_records(records: &[NutrientRecord], labels: Option<&[u8]>) -> Result<Self> {
        let mut columns = vec![
            Column::numeric(
                AGE_COLUMN,
                records.iter().map(|r| Some(r.age() as f64)).collect(),
            ),
            Column::text(
                GENDER_COLUMN,
                records.iter().map(|r| Some(r.gender().as_str().to_string())).collect(),
            ),
            Column::text(
                INCOME_BRACKET_COLUMN,
                records
                    .iter()
                    .map(|r| Some(r.income_bracket().as_str().to_string()))
                    .collect(),
            ),
            Column::text(
                EDUCATION_LEVEL_COLUMN,
                records
                    .iter()
                    .map(|r| Some(r.education_level().as_str().to_string()))
                    .collect(),
            ),
        ];
        for nutrient in Nutrient::ALL {
            columns.push(Column::numeric(
                nutrient.column_name(),
                records.iter().map(|r| Some(r.value(nutrient))).collect(),
            ));
        }
        if let Some(labels) = labels {
            if labels.len() != records.len() {
                return Err(NutriError::Data(format!(
                    "{} labels supplied for {} records",
                    labels.len(),
                    records.len()
                )));
            }
            columns.push(Column::numeric(
                LABEL_COLUMN,
                labels.iter().map(|&l| Some(l as f64)).collect(),
            ));
        }
        TrainingDataset::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Numeric cells of a column; `DataError` when absent or holding text.
    pub fn numeric_column(&self, name: &str) -> Result<&[Option<f64>]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(values)) => Ok(values),
            Some(ColumnData::Text(_)) => Err(NutriError::Data(format!(
                "column '{}' is not numeric",
                name
            ))),
            None => Err(NutriError::Data(format!("missing required column '{}'", name))),
        }
    }

    /// Binary labels from `target`. A missing target column is a schema
    /// mismatch; missing cells or values other than 0/1 are data errors.
    pub fn labels(&self, target: &str) -> Result<Vec<u8>> {
        let values = match self.column(target).map(|c| &c.data) {
            Some(ColumnData::Numeric(values)) => values,
            Some(ColumnData::Text(_)) => {
                return Err(NutriError::Data(format!(
                    "target column '{}' must hold 0/1 labels",
                    target
                )))
            }
            None => {
                return Err(NutriError::Schema(format!(
                    "target column '{}' not found in dataset",
                    target
                )))
            }
        };

        values
            .iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(v) if *v == 0.0 => Ok(0u8),
                Some(v) if *v == 1.0 => Ok(1u8),
                other => Err(NutriError::Data(format!(
                    "row {}: label {:?} in '{}' is not 0 or 1",
                    row + 1,
                    other,
                    target
                ))),
            })
            .collect()
    }

    /// New dataset holding only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> TrainingDataset {
        TrainingDataset {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.select(indices),
                })
                .collect(),
            n_rows: indices.len(),
        }
    }

    /// Copy of the dataset with `name` dropped (no-op when absent).
    pub fn without_column(&self, name: &str) -> TrainingDataset {
        TrainingDataset {
            columns: self.columns.iter().filter(|c| c.name != name).cloned().collect(),
            n_rows: self.n_rows,
        }
    }

    pub fn log_input_data_summary(&self, target: &str) {
        log::info!("----- Input Data Summary -----");
        log::info!("{} rows, {} columns", self.n_rows, self.columns.len());
        if let Ok(labels) = self.labels(target) {
            let positives = labels.iter().filter(|&&l| l == 1).count();
            log::info!(
                "{} at-risk ({}=1) and {} not at-risk records",
                positives,
                target,
                labels.len() - positives
            );
        }
        log::info!("-------------------------------");
    }
}
