use nutriscope_core::data_handling::{
    EducationLevel, Gender, IncomeBracket, Nutrient, NutrientIntake, NutrientRecord,
};
use nutriscope_core::io::{read_dataset_from_reader, DatasetReaderConfig};
use nutriscope_core::scorer::{score, FeedbackLevel, RiskCategory};
use nutriscope_core::sink::Assessor;
use nutriscope_core::stats::ReferenceStatistics;

const REFERENCE: &str = "\
Age,Gender,Income_Bracket,Education_Level,Vitamin_A_Intake_ug,Vitamin_D_Intake_IU,Zinc_Intake_mg,Iron_Intake_mg,Folate_Intake_ug,Region
25,Female,low,primary,400,500,8,10,300,north
41,Male,high,tertiary,800,700,12,18,500,south
33,Female,upper_middle,secondary,,600,10,14,400,east
";

fn record(intake: NutrientIntake) -> NutrientRecord {
    NutrientRecord::new(
        36,
        Gender::Male,
        IncomeBracket::UpperMiddle,
        EducationLevel::Tertiary,
        intake,
    )
    .unwrap()
}

fn reference_stats() -> ReferenceStatistics {
    let dataset =
        read_dataset_from_reader(REFERENCE.as_bytes(), &DatasetReaderConfig::reference()).unwrap();
    ReferenceStatistics::from_dataset(&dataset).unwrap()
}

#[test]
fn reference_means_skip_missing_cells() {
    let stats = reference_stats();
    assert_eq!(stats.mean(Nutrient::VitaminA), 600.0);
    assert_eq!(stats.mean(Nutrient::VitaminD), 600.0);
    assert_eq!(stats.mean(Nutrient::Iron), 14.0);
}

#[test]
fn intake_at_the_means_is_healthy() {
    let stats = reference_stats();
    let assessment = Assessor::new(stats)
        .assess(&record(NutrientIntake {
            vitamin_a_ug: 600.0,
            vitamin_d_iu: 600.0,
            zinc_mg: 10.0,
            iron_mg: 14.0,
            folate_ug: 400.0,
        }))
        .unwrap()
        .assessment;

    assert_eq!(assessment.average_ratio, 1.0);
    assert_eq!(assessment.risk_score, 0.0);
    assert_eq!(assessment.risk_category, RiskCategory::Low);
    assert!(assessment
        .per_nutrient_feedback
        .iter()
        .all(|f| f.level == FeedbackLevel::Healthy));
}

#[test]
fn scores_stay_in_unit_range_and_repeat_exactly() {
    let stats = reference_stats();
    for step in 0..=40 {
        let factor = step as f64 * 0.1;
        let r = record(NutrientIntake {
            vitamin_a_ug: 600.0 * factor,
            vitamin_d_iu: 450.0 * factor,
            zinc_mg: 12.5 * factor,
            iron_mg: 3.0 * factor,
            folate_ug: 777.0 * factor,
        });
        let first = score(&r, &stats).unwrap();
        let second = score(&r, &stats).unwrap();
        assert!((0.0..=1.0).contains(&first.risk_score));
        assert_eq!(first.risk_score.to_bits(), second.risk_score.to_bits());
        assert_eq!(first, second);
    }
}
