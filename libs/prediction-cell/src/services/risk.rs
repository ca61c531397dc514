// libs/prediction-cell/src/services/risk.rs
//
// Risk level derivation for classifier results. Pure functions only;
// the inference client and the workflow service live elsewhere.

use crate::models::{ActivityLevel, AlcoholUse, PatientData, RiskLevel, SmokingStatus};

/// Maps a classifier label and probability plus the patient snapshot to a
/// discrete risk level. Base level comes from the label and probability
/// thresholds; each aggravating factor then escalates one step, saturating
/// at `very high`. Labels other than `non-diabetic`/`pre-diabetic` take
/// the diabetic thresholds.
pub fn classify(label: &str, probability: f64, patient: &PatientData) -> RiskLevel {
    let base = match label {
        "non-diabetic" => {
            if probability < 0.2 {
                RiskLevel::Low
            } else {
                RiskLevel::Moderate
            }
        }
        "pre-diabetic" => {
            if probability < 0.5 {
                RiskLevel::Moderate
            } else {
                RiskLevel::High
            }
        }
        _ => {
            if probability < 0.8 {
                RiskLevel::High
            } else {
                RiskLevel::VeryHigh
            }
        }
    };

    aggravating_factors(patient)
        .iter()
        .fold(base, |level, _| level.escalate())
}

/// Names each aggravating factor present in the snapshot. The count
/// drives escalation; the names feed the stored risk-factor list when
/// the classifier itself does not provide one.
pub fn aggravating_factors(patient: &PatientData) -> Vec<&'static str> {
    let mut factors = Vec::new();

    if patient.age > 65 {
        factors.push("Age over 65");
    }
    if patient.bmi > 35.0 {
        factors.push("BMI over 35");
    }
    if patient.blood_pressure.systolic > 140 || patient.blood_pressure.diastolic > 90 {
        factors.push("Elevated blood pressure");
    }
    if patient.family_history {
        factors.push("Family history of diabetes");
    }
    if patient.physical_activity == ActivityLevel::Sedentary {
        factors.push("Sedentary lifestyle");
    }
    if patient.smoking_status == SmokingStatus::Current {
        factors.push("Current smoker");
    }
    if patient.alcohol_consumption == AlcoholUse::Heavy {
        factors.push("Heavy alcohol consumption");
    }

    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BloodPressure;

    fn patient() -> PatientData {
        PatientData {
            age: 40,
            gender: crate::models::Gender::Male,
            bmi: 24.0,
            blood_pressure: BloodPressure { systolic: 118, diastolic: 76 },
            glucose_level: 95.0,
            insulin_level: 60.0,
            skin_thickness: 20.0,
            diabetes_pedigree_function: 0.4,
            pregnancies: 0,
            physical_activity: ActivityLevel::Moderate,
            smoking_status: SmokingStatus::Never,
            alcohol_consumption: AlcoholUse::None,
            family_history: false,
        }
    }

    #[test]
    fn base_mapping_follows_label_thresholds() {
        let p = patient();
        assert_eq!(classify("non-diabetic", 0.1, &p), RiskLevel::Low);
        assert_eq!(classify("non-diabetic", 0.3, &p), RiskLevel::Moderate);
        assert_eq!(classify("pre-diabetic", 0.4, &p), RiskLevel::Moderate);
        assert_eq!(classify("pre-diabetic", 0.6, &p), RiskLevel::High);
        assert_eq!(classify("diabetic", 0.7, &p), RiskLevel::High);
        assert_eq!(classify("diabetic", 0.9, &p), RiskLevel::VeryHigh);
    }

    #[test]
    fn unexpected_labels_take_the_diabetic_branch() {
        let p = patient();
        assert_eq!(classify("borderline", 0.5, &p), RiskLevel::High);
        assert_eq!(classify("borderline", 0.95, &p), RiskLevel::VeryHigh);
    }

    #[test]
    fn single_factor_escalates_one_step() {
        let mut p = patient();
        p.age = 70;
        assert_eq!(classify("non-diabetic", 0.1, &p), RiskLevel::Moderate);
    }

    #[test]
    fn factors_accumulate_and_saturate() {
        let mut p = patient();
        p.age = 70;
        p.bmi = 38.0;
        p.blood_pressure = BloodPressure { systolic: 150, diastolic: 95 };
        p.family_history = true;
        p.physical_activity = ActivityLevel::Sedentary;
        p.smoking_status = SmokingStatus::Current;
        p.alcohol_consumption = AlcoholUse::Heavy;

        assert_eq!(aggravating_factors(&p).len(), 7);
        // low + 7 steps saturates well past the top of the order.
        assert_eq!(classify("non-diabetic", 0.1, &p), RiskLevel::VeryHigh);
    }

    #[test]
    fn adding_a_factor_never_lowers_risk() {
        let labels = ["non-diabetic", "pre-diabetic", "diabetic"];
        let probabilities = [0.1, 0.3, 0.5, 0.7, 0.9];

        for label in labels {
            for probability in probabilities {
                let baseline = classify(label, probability, &patient());

                let mut with_factor = patient();
                with_factor.family_history = true;
                let escalated = classify(label, probability, &with_factor);

                assert!(escalated >= baseline, "{} @ {}", label, probability);
            }
        }
    }

    #[test]
    fn borderline_values_do_not_escalate() {
        let mut p = patient();
        p.age = 65;
        p.bmi = 35.0;
        p.blood_pressure = BloodPressure { systolic: 140, diastolic: 90 };
        assert!(aggravating_factors(&p).is_empty());
        assert_eq!(classify("non-diabetic", 0.1, &p), RiskLevel::Low);
    }
}
