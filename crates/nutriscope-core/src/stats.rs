//! Population reference statistics and small summary helpers.
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::data_handling::{Nutrient, TrainingDataset};
use crate::error::{NutriError, Result};

/// Per-nutrient population mean intakes, used as the denominator of the
/// intake ratios computed by the risk scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStatistics {
    means: [f64; 5],
}

impl ReferenceStatistics {
    /// Compute the arithmetic mean of each tracked nutrient column, ignoring
    /// missing cells.
    ///
    /// # Errors
    ///
    /// `DataError` if a nutrient column is absent, not numeric, or has no
    /// present values at all.
    pub fn from_dataset(dataset: &TrainingDataset) -> Result<Self> {
        let mut means = [0.0; 5];
        for nutrient in Nutrient::ALL {
            let values = dataset.numeric_column(nutrient.column_name())?;
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            if present.is_empty() {
                return Err(NutriError::Data(format!(
                    "column '{}' has no values",
                    nutrient.column_name()
                )));
            }
            means[nutrient.index()] = present.iter().sum::<f64>() / present.len() as f64;
        }

        log::debug!("Reference means: {:?}", means);
        Ok(ReferenceStatistics { means })
    }

    /// Build statistics from known means. Nutrients not listed default to 0.0,
    /// which the scorer rejects with a `DivisionError`.
    pub fn from_means<I>(means: I) -> Self
    where
        I: IntoIterator<Item = (Nutrient, f64)>,
    {
        let mut table = [0.0; 5];
        for (nutrient, mean) in means {
            table[nutrient.index()] = mean;
        }
        ReferenceStatistics { means: table }
    }

    pub fn mean(&self, nutrient: Nutrient) -> f64 {
        self.means[nutrient.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.iter().map(move |&n| (n, self.means[n.index()]))
    }
}

/// Mean and population standard deviation (numpy's default `ddof=0`).
/// Returns `None` for an empty slice.
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().mean();
    let std = values.iter().population_std_dev();
    Some((mean, std))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Column;

    fn nutrient_columns(values: [Vec<Option<f64>>; 5]) -> Vec<Column> {
        Nutrient::ALL
            .iter()
            .zip(values)
            .map(|(n, v)| Column::numeric(n.column_name(), v))
            .collect()
    }

    #[test]
    fn means_ignore_missing_values() {
        let ds = TrainingDataset::new(nutrient_columns([
            vec![Some(100.0), Some(300.0), None],
            vec![Some(10.0), Some(10.0), Some(40.0)],
            vec![Some(1.0), None, None],
            vec![Some(2.0), Some(4.0), Some(6.0)],
            vec![None, Some(5.0), Some(7.0)],
        ]))
        .unwrap();

        let stats = ReferenceStatistics::from_dataset(&ds).unwrap();
        assert_eq!(stats.mean(Nutrient::VitaminA), 200.0);
        assert_eq!(stats.mean(Nutrient::VitaminD), 20.0);
        assert_eq!(stats.mean(Nutrient::Zinc), 1.0);
        assert_eq!(stats.mean(Nutrient::Iron), 4.0);
        assert_eq!(stats.mean(Nutrient::Folate), 6.0);
    }

    #[test]
    fn all_missing_column_is_data_error() {
        let ds = TrainingDataset::new(nutrient_columns([
            vec![Some(1.0)],
            vec![Some(1.0)],
            vec![None],
            vec![Some(1.0)],
            vec![Some(1.0)],
        ]))
        .unwrap();
        assert!(matches!(
            ReferenceStatistics::from_dataset(&ds),
            Err(NutriError::Data(_))
        ));
    }

    #[test]
    fn absent_column_is_data_error() {
        let ds = TrainingDataset::new(vec![Column::numeric("Age", vec![Some(30.0)])]).unwrap();
        assert!(matches!(
            ReferenceStatistics::from_dataset(&ds),
            Err(NutriError::Data(_))
        ));
    }

    #[test]
    fn mean_and_std_is_population_std() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
        assert!(mean_and_std(&[]).is_none());
    }
}
