// libs/prediction-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// PATIENT SNAPSHOT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Active,
    #[serde(rename = "very active")]
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmokingStatus {
    #[default]
    Never,
    Former,
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlcoholUse {
    #[default]
    None,
    Light,
    Moderate,
    Heavy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: i32,
    pub diastolic: i32,
}

/// Health snapshot sent by the client and forwarded to the classifier.
/// Field names follow the classifier's wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    pub age: i32,
    pub gender: Gender,
    pub bmi: f64,
    pub blood_pressure: BloodPressure,
    pub glucose_level: f64,
    pub insulin_level: f64,
    pub skin_thickness: f64,
    pub diabetes_pedigree_function: f64,
    #[serde(default)]
    pub pregnancies: i32,
    #[serde(default)]
    pub physical_activity: ActivityLevel,
    #[serde(default)]
    pub smoking_status: SmokingStatus,
    #[serde(default)]
    pub alcohol_consumption: AlcoholUse,
    #[serde(default)]
    pub family_history: bool,
}

impl PatientData {
    /// Range checks applied before anything is persisted. Enum-valued
    /// fields are already constrained by deserialization.
    pub fn validate(&self) -> Result<(), String> {
        if self.age < 0 {
            return Err("Age must be a positive number".to_string());
        }
        if self.age > 120 {
            return Err("Age must be less than 120".to_string());
        }
        if self.bmi < 10.0 {
            return Err("BMI must be at least 10".to_string());
        }
        if self.bmi > 50.0 {
            return Err("BMI must be less than 50".to_string());
        }
        if self.blood_pressure.systolic < 70 {
            return Err("Systolic blood pressure must be at least 70".to_string());
        }
        if self.blood_pressure.systolic > 250 {
            return Err("Systolic blood pressure must be less than 250".to_string());
        }
        if self.blood_pressure.diastolic < 40 {
            return Err("Diastolic blood pressure must be at least 40".to_string());
        }
        if self.blood_pressure.diastolic > 150 {
            return Err("Diastolic blood pressure must be less than 150".to_string());
        }
        if self.glucose_level < 50.0 {
            return Err("Glucose level must be at least 50".to_string());
        }
        if self.glucose_level > 500.0 {
            return Err("Glucose level must be less than 500".to_string());
        }
        if self.insulin_level < 0.0 {
            return Err("Insulin level must be a positive number".to_string());
        }
        if self.insulin_level > 1000.0 {
            return Err("Insulin level must be less than 1000".to_string());
        }
        if self.skin_thickness < 0.0 {
            return Err("Skin thickness must be a positive number".to_string());
        }
        if self.skin_thickness > 100.0 {
            return Err("Skin thickness must be less than 100".to_string());
        }
        if self.diabetes_pedigree_function < 0.0 {
            return Err("Diabetes pedigree function must be a positive number".to_string());
        }
        if self.diabetes_pedigree_function > 2.5 {
            return Err("Diabetes pedigree function must be less than 2.5".to_string());
        }
        if self.pregnancies < 0 {
            return Err("Pregnancies must be a positive number".to_string());
        }
        if self.pregnancies > 20 {
            return Err("Pregnancies must be less than 20".to_string());
        }
        Ok(())
    }
}

// ==============================================================================
// RISK LEVELS AND RESULTS
// ==============================================================================

/// Ordered severity tags. Variant order carries the total order used by
/// the escalation pass, so `Ord` must follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    #[serde(rename = "very high")]
    VeryHigh,
}

impl RiskLevel {
    /// One step up the severity order, saturating at the top.
    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Moderate,
            RiskLevel::Moderate => RiskLevel::High,
            RiskLevel::High => RiskLevel::VeryHigh,
            RiskLevel::VeryHigh => RiskLevel::VeryHigh,
        }
    }

    pub fn is_elevated(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::VeryHigh)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very high",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PredictionStatus::Pending => "pending",
            PredictionStatus::Completed => "completed",
            PredictionStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Classifier outcome stored on the prediction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub prediction: String,
    pub probability: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

// ==============================================================================
// RECORDS AND REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_data: PatientData,
    pub result: Option<PredictionResult>,
    pub status: PredictionStatus,
    pub notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePredictionRequest {
    pub patient_data: PatientData,
}

/// Reviewer annotation. Never re-invokes the classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPredictionRequest {
    pub notes: Option<String>,
    pub review_notes: Option<String>,
    pub status: Option<PredictionStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<PredictionStatus>,
    pub result: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub user: Option<Uuid>,
}

// ==============================================================================
// STATS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStat {
    pub label: String,
    pub count: usize,
    pub avg_age: Option<f64>,
    pub avg_bmi: Option<f64>,
    pub avg_glucose: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskStat {
    pub risk_level: RiskLevel,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStat {
    pub year: i32,
    pub month: u32,
    pub count: usize,
    pub diabetic: usize,
    pub non_diabetic: usize,
    pub pre_diabetic: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionStats {
    pub by_label: Vec<LabelStat>,
    pub by_risk: Vec<RiskStat>,
    pub monthly: Vec<MonthlyStat>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PredictionError {
    #[error("Prediction not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to prediction")]
    Unauthorized,

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Classifier request timed out")]
    ClassifierTimeout,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> PatientData {
        serde_json::from_value(json!({
            "age": 45,
            "gender": "female",
            "bmi": 28.5,
            "bloodPressure": { "systolic": 120, "diastolic": 80 },
            "glucoseLevel": 110.0,
            "insulinLevel": 80.0,
            "skinThickness": 25.0,
            "diabetesPedigreeFunction": 0.52,
            "pregnancies": 2
        }))
        .unwrap()
    }

    #[test]
    fn lifestyle_fields_default_when_absent() {
        let data = snapshot();
        assert_eq!(data.physical_activity, ActivityLevel::Moderate);
        assert_eq!(data.smoking_status, SmokingStatus::Never);
        assert_eq!(data.alcohol_consumption, AlcoholUse::None);
        assert!(!data.family_history);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn out_of_range_values_name_the_field() {
        let mut data = snapshot();
        data.age = 130;
        assert_eq!(data.validate().unwrap_err(), "Age must be less than 120");

        let mut data = snapshot();
        data.glucose_level = 20.0;
        assert_eq!(data.validate().unwrap_err(), "Glucose level must be at least 50");

        let mut data = snapshot();
        data.blood_pressure.diastolic = 30;
        assert_eq!(
            data.validate().unwrap_err(),
            "Diastolic blood pressure must be at least 40"
        );
    }

    #[test]
    fn very_active_round_trips_with_space() {
        let level: ActivityLevel = serde_json::from_value(json!("very active")).unwrap();
        assert_eq!(level, ActivityLevel::VeryActive);
        assert_eq!(serde_json::to_value(level).unwrap(), json!("very active"));
    }

    #[test]
    fn risk_level_order_and_wire_names() {
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::High < RiskLevel::VeryHigh);
        assert_eq!(serde_json::to_value(RiskLevel::VeryHigh).unwrap(), json!("very high"));
        assert_eq!(RiskLevel::VeryHigh.escalate(), RiskLevel::VeryHigh);
    }
}
