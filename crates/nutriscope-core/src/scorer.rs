//! Nutrient-ratio risk scoring.
//!
//! Each tracked intake is divided by its population reference mean. The
//! unweighted average of the five ratios drives the overall risk score and
//! category, and the same thresholds grade each nutrient individually.
//!
//! All five nutrients carry equal weight and the 0.7 / 0.9 cut-offs are fixed
//! policy constants, not clinically validated thresholds. Keep them unchanged
//! unless the domain owners sign off on a new policy.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data_handling::{Nutrient, NutrientRecord};
use crate::error::{NutriError, Result};
use crate::stats::ReferenceStatistics;

/// Ratios strictly below this are high risk / "very low".
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;
/// Ratios strictly below this (and at least `HIGH_RISK_THRESHOLD`) are
/// moderate risk / "slightly low".
pub const MODERATE_RISK_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    High,
    Moderate,
    Low,
}

impl RiskCategory {
    /// Band an average ratio. Values exactly on a threshold belong to the
    /// higher (less risky) band.
    pub fn from_ratio(average_ratio: f64) -> Self {
        if average_ratio < HIGH_RISK_THRESHOLD {
            RiskCategory::High
        } else if average_ratio < MODERATE_RISK_THRESHOLD {
            RiskCategory::Moderate
        } else {
            RiskCategory::Low
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            RiskCategory::High => "High",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    VeryLow,
    SlightlyLow,
    Healthy,
}

impl FeedbackLevel {
    pub fn from_ratio(ratio: f64) -> Self {
        match RiskCategory::from_ratio(ratio) {
            RiskCategory::High => FeedbackLevel::VeryLow,
            RiskCategory::Moderate => FeedbackLevel::SlightlyLow,
            RiskCategory::Low => FeedbackLevel::Healthy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackLevel::VeryLow => "very low",
            FeedbackLevel::SlightlyLow => "slightly low",
            FeedbackLevel::Healthy => "healthy",
        }
    }
}

impl fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientFeedback {
    pub nutrient: Nutrient,
    pub ratio: f64,
    pub level: FeedbackLevel,
}

impl NutrientFeedback {
    /// One-line summary, e.g. `Zinc: Slightly low intake (82.0% of avg)`.
    pub fn message(&self) -> String {
        let level = match self.level {
            FeedbackLevel::VeryLow => "Very low intake",
            FeedbackLevel::SlightlyLow => "Slightly low intake",
            FeedbackLevel::Healthy => "Healthy intake",
        };
        format!("{}: {} ({:.1}% of avg)", self.nutrient, level, self.ratio * 100.0)
    }
}

/// Outcome of a single assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub average_ratio: f64,
    /// `clamp(1 - average_ratio, 0, 1)`.
    pub risk_score: f64,
    pub risk_category: RiskCategory,
    /// One entry per nutrient, in `Nutrient::ALL` order.
    pub per_nutrient_feedback: Vec<NutrientFeedback>,
}

/// Intake / reference-mean ratio for one nutrient.
///
/// # Errors
///
/// `DivisionError` when the reference mean is zero, negative or not finite.
pub fn nutrient_ratio(
    record: &NutrientRecord,
    stats: &ReferenceStatistics,
    nutrient: Nutrient,
) -> Result<f64> {
    let mean = stats.mean(nutrient);
    if !(mean.is_finite() && mean > 0.0) {
        return Err(NutriError::Division { nutrient, mean });
    }
    Ok(record.value(nutrient) / mean)
}

/// Score one record against the reference statistics.
pub fn score(record: &NutrientRecord, stats: &ReferenceStatistics) -> Result<RiskAssessment> {
    let per_nutrient_feedback = Nutrient::ALL
        .iter()
        .map(|&nutrient| {
            let ratio = nutrient_ratio(record, stats, nutrient)?;
            Ok(NutrientFeedback {
                nutrient,
                ratio,
                level: FeedbackLevel::from_ratio(ratio),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let average_ratio = per_nutrient_feedback.iter().map(|f| f.ratio).sum::<f64>()
        / per_nutrient_feedback.len() as f64;
    let risk_score = (1.0 - average_ratio).clamp(0.0, 1.0);

    Ok(RiskAssessment {
        average_ratio,
        risk_score,
        risk_category: RiskCategory::from_ratio(average_ratio),
        per_nutrient_feedback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::{EducationLevel, Gender, IncomeBracket, NutrientIntake};

    fn stats(mean: f64) -> ReferenceStatistics {
        ReferenceStatistics::from_means(Nutrient::ALL.iter().map(|&n| (n, mean)))
    }

    fn record(values: [f64; 5]) -> NutrientRecord {
        NutrientRecord::new(
            28,
            Gender::Female,
            IncomeBracket::LowerMiddle,
            EducationLevel::Secondary,
            NutrientIntake {
                vitamin_a_ug: values[0],
                vitamin_d_iu: values[1],
                zinc_mg: values[2],
                iron_mg: values[3],
                folate_ug: values[4],
            },
        )
        .unwrap()
    }

    #[test]
    fn category_boundaries_belong_to_higher_band() {
        assert_eq!(RiskCategory::from_ratio(0.69999), RiskCategory::High);
        assert_eq!(RiskCategory::from_ratio(0.7), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_ratio(0.89999), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_ratio(0.9), RiskCategory::Low);
        assert_eq!(FeedbackLevel::from_ratio(0.7), FeedbackLevel::SlightlyLow);
        assert_eq!(FeedbackLevel::from_ratio(0.9), FeedbackLevel::Healthy);
    }

    #[test]
    fn average_ratio_at_070_is_moderate() {
        // ratios 0.5, 0.5, 1.0, 1.0, 0.5 -> 3.5 / 5
        let a = score(&record([1.0, 1.0, 2.0, 2.0, 1.0]), &stats(2.0)).unwrap();
        assert_eq!(a.average_ratio, 0.7);
        assert_eq!(a.risk_category, RiskCategory::Moderate);
    }

    #[test]
    fn average_ratio_at_090_is_low() {
        // ratios 1.0, 1.0, 1.0, 0.5, 1.0 -> 4.5 / 5
        let a = score(&record([2.0, 2.0, 2.0, 1.0, 2.0]), &stats(2.0)).unwrap();
        assert_eq!(a.average_ratio, 0.9);
        assert_eq!(a.risk_category, RiskCategory::Low);
        assert_eq!(a.per_nutrient_feedback[3].level, FeedbackLevel::VeryLow);
    }

    #[test]
    fn intake_at_reference_mean_is_low_risk() {
        let a = score(&record([500.0; 5]), &stats(500.0)).unwrap();
        assert_eq!(a.average_ratio, 1.0);
        assert_eq!(a.risk_score, 0.0);
        assert_eq!(a.risk_category, RiskCategory::Low);
        assert!(a
            .per_nutrient_feedback
            .iter()
            .all(|f| f.level == FeedbackLevel::Healthy));
    }

    #[test]
    fn half_intake_is_high_risk() {
        let a = score(&record([50.0; 5]), &stats(100.0)).unwrap();
        assert_eq!(a.average_ratio, 0.5);
        assert_eq!(a.risk_score, 0.5);
        assert_eq!(a.risk_category, RiskCategory::High);
        assert!(a
            .per_nutrient_feedback
            .iter()
            .all(|f| f.level == FeedbackLevel::VeryLow));
    }

    #[test]
    fn risk_score_is_clamped() {
        let surplus = score(&record([400.0; 5]), &stats(100.0)).unwrap();
        assert_eq!(surplus.risk_score, 0.0);
        let nothing = score(&record([0.0; 5]), &stats(100.0)).unwrap();
        assert_eq!(nothing.risk_score, 1.0);
    }

    #[test]
    fn zero_mean_is_division_error() {
        let stats = ReferenceStatistics::from_means([
            (Nutrient::VitaminA, 700.0),
            (Nutrient::VitaminD, 600.0),
            (Nutrient::Zinc, 0.0),
            (Nutrient::Iron, 14.0),
            (Nutrient::Folate, 400.0),
        ]);
        let err = score(&record([1.0; 5]), &stats).unwrap_err();
        assert!(matches!(
            err,
            NutriError::Division { nutrient: Nutrient::Zinc, .. }
        ));
    }

    #[test]
    fn feedback_message_formats_percentage() {
        let a = score(&record([41.0, 100.0, 100.0, 100.0, 100.0]), &stats(50.0)).unwrap();
        assert_eq!(
            a.per_nutrient_feedback[0].message(),
            "Vitamin A: Slightly low intake (82.0% of avg)"
        );
    }
}
