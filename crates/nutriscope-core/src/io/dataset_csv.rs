//! CSV/TSV reader for the hidden hunger reference and training datasets.
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::data_handling::{
    Column, Nutrient, TrainingDataset, AGE_COLUMN, CATEGORICAL_COLUMNS, LABEL_COLUMN,
};
use crate::error::{NutriError, Result};

/// Cell spellings treated as missing values.
const MISSING_MARKERS: [&str; 7] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Configuration for reading a hidden hunger dataset.
#[derive(Debug, Clone)]
pub struct DatasetReaderConfig {
    /// Columns that must be present in the header; extra columns are kept.
    pub required_columns: Vec<String>,
    /// Columns always read as text, regardless of their content.
    pub categorical_columns: Vec<String>,
    /// Field delimiter. When `None`, `.tsv` files use tabs and anything else commas.
    pub delimiter: Option<u8>,
}

impl DatasetReaderConfig {
    /// Columns needed to compute reference statistics and to score records.
    pub fn reference() -> Self {
        let mut required = vec![AGE_COLUMN.to_string()];
        required.extend(CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()));
        required.extend(Nutrient::ALL.iter().map(|n| n.column_name().to_string()));
        Self {
            required_columns: required,
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            delimiter: None,
        }
    }

    /// Reference columns plus the `Hidden_Hunger_Flag` label.
    pub fn training() -> Self {
        let mut config = Self::reference();
        config.required_columns.push(LABEL_COLUMN.to_string());
        config
    }
}

impl Default for DatasetReaderConfig {
    fn default() -> Self {
        Self::training()
    }
}

/// Load a dataset carrying the reference (feature) columns.
pub fn load_reference_dataset<P: AsRef<Path>>(path: P) -> Result<TrainingDataset> {
    read_dataset_with_config(path, &DatasetReaderConfig::reference())
}

/// Load a labelled training dataset.
pub fn load_training_dataset<P: AsRef<Path>>(path: P) -> Result<TrainingDataset> {
    read_dataset_with_config(path, &DatasetReaderConfig::training())
}

/// Read a dataset file using a custom configuration.
pub fn read_dataset_with_config<P: AsRef<Path>>(
    path: P,
    config: &DatasetReaderConfig,
) -> Result<TrainingDataset> {
    let path = path.as_ref();
    let delimiter = config.delimiter.unwrap_or_else(|| delimiter_for(path));
    let file = File::open(path)?;
    log::debug!("Reading dataset from {}", path.display());
    read_delimited(file, config, delimiter)
}

/// Read a comma-separated dataset from any reader.
pub fn read_dataset_from_reader<R: Read>(
    reader: R,
    config: &DatasetReaderConfig,
) -> Result<TrainingDataset> {
    read_delimited(reader, config, config.delimiter.unwrap_or(b','))
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
        Some(ext) if ext == "tsv" => b'\t',
        _ => b',',
    }
}

fn read_delimited<R: Read>(
    reader: R,
    config: &DatasetReaderConfig,
    delimiter: u8,
) -> Result<TrainingDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = config
        .required_columns
        .iter()
        .filter(|name| find_column(&headers, name).is_none())
        .map(|name| name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(NutriError::Data(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != headers.len() {
            return Err(NutriError::Data(format!(
                "row {} has {} fields, expected {}",
                row_idx + 1,
                record.len(),
                headers.len()
            )));
        }
        for (col_idx, value) in record.iter().enumerate() {
            let cell = if MISSING_MARKERS.contains(&value) {
                None
            } else {
                Some(value.to_string())
            };
            cells[col_idx].push(cell);
        }
    }

    let n_rows = cells.first().map(|c| c.len()).unwrap_or(0);
    if n_rows == 0 {
        return Err(NutriError::Data("dataset contains no rows".to_string()));
    }

    let categorical: HashSet<&str> = config.categorical_columns.iter().map(|c| c.as_str()).collect();
    let required: HashSet<&str> = config.required_columns.iter().map(|c| c.as_str()).collect();

    let mut columns = Vec::with_capacity(headers.len());
    for (name, values) in headers.iter().zip(cells) {
        if categorical.contains(name) {
            columns.push(Column::text(name, values));
            continue;
        }
        match parse_numeric(&values) {
            Ok(parsed) => columns.push(Column::numeric(name, parsed)),
            Err(bad_row) if required.contains(name) => {
                return Err(NutriError::Data(format!(
                    "invalid numeric value {:?} in column '{}' at row {}",
                    values[bad_row].as_deref().unwrap_or(""),
                    name,
                    bad_row + 1
                )));
            }
            Err(_) => {
                log::debug!("Column '{}' is not numeric; keeping it as text", name);
                columns.push(Column::text(name, values));
            }
        }
    }

    let dataset = TrainingDataset::new(columns)?;
    log::info!(
        "Loaded dataset with shape: ({}, {})",
        dataset.n_rows(),
        dataset.columns().len()
    );
    Ok(dataset)
}

/// Parse every present cell as `f64`; returns the offending row on failure.
/// Parsed `NaN`s count as missing; infinities are rejected.
fn parse_numeric(values: &[Option<String>]) -> std::result::Result<Vec<Option<f64>>, usize> {
    values
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(text) => match text.parse::<f64>() {
                Ok(v) if v.is_nan() => Ok(None),
                Ok(v) if v.is_finite() => Ok(Some(v)),
                _ => Err(row),
            },
        })
        .collect()
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::ColumnData;

    const HEADER: &str = "Age,Gender,Income_Bracket,Education_Level,Vitamin_A_Intake_ug,Vitamin_D_Intake_IU,Zinc_Intake_mg,Iron_Intake_mg,Folate_Intake_ug,Hidden_Hunger_Flag";

    #[test]
    fn reads_training_csv() {
        let csv = format!(
            "{}\n34,Female,low,primary,600,400,8,12,300,1\n51,Male,high,tertiary,900,,11,16,420,0\n",
            HEADER
        );
        let ds = read_dataset_from_reader(csv.as_bytes(), &DatasetReaderConfig::training()).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(
            ds.numeric_column("Vitamin_D_Intake_IU").unwrap(),
            &[Some(400.0), None]
        );
        assert!(matches!(ds.column("Gender").unwrap().data, ColumnData::Text(_)));
        assert_eq!(ds.labels(LABEL_COLUMN).unwrap(), vec![1, 0]);
    }

    #[test]
    fn missing_required_column_is_data_error() {
        let csv = "Age,Gender\n30,Male\n";
        let err = read_dataset_from_reader(csv.as_bytes(), &DatasetReaderConfig::reference())
            .unwrap_err();
        assert!(matches!(err, NutriError::Data(ref msg) if msg.contains("Income_Bracket")));
    }

    #[test]
    fn extra_columns_are_kept() {
        let csv = format!(
            "{},Region,Household_Size\n34,Female,low,primary,600,400,8,12,300,1,north,4\n",
            HEADER
        );
        let ds = read_dataset_from_reader(csv.as_bytes(), &DatasetReaderConfig::training()).unwrap();
        assert!(matches!(ds.column("Region").unwrap().data, ColumnData::Text(_)));
        assert_eq!(ds.numeric_column("Household_Size").unwrap(), &[Some(4.0)]);
    }

    #[test]
    fn text_in_required_numeric_column_is_rejected() {
        let csv = format!("{}\n34,Female,low,primary,lots,400,8,12,300,1\n", HEADER);
        let err =
            read_dataset_from_reader(csv.as_bytes(), &DatasetReaderConfig::training()).unwrap_err();
        assert!(matches!(err, NutriError::Data(ref msg) if msg.contains("Vitamin_A_Intake_ug")));
    }

    #[test]
    fn infinite_intake_is_rejected() {
        let csv = format!(
            "{}\n34,Female,low,primary,600,400,8,12,300,1\n40,Male,low,primary,inf,400,8,12,300,0\n",
            HEADER
        );
        let err =
            read_dataset_from_reader(csv.as_bytes(), &DatasetReaderConfig::training()).unwrap_err();
        assert!(matches!(
            err,
            NutriError::Data(ref msg) if msg.contains("Vitamin_A_Intake_ug") && msg.contains("row 2")
        ));

        let csv = format!("{}\n34,Female,low,primary,600,-inf,8,12,300,1\n", HEADER);
        assert!(read_dataset_from_reader(csv.as_bytes(), &DatasetReaderConfig::training()).is_err());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let csv = format!("{}\n", HEADER);
        assert!(read_dataset_from_reader(csv.as_bytes(), &DatasetReaderConfig::training()).is_err());
    }
}
