// libs/report-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// REPORT MODELS
// ==============================================================================

/// A prediction bookmarked by its owner, with presentation metadata.
/// One row per (user, prediction) pair, enforced by the save upsert
/// rather than a datastore constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prediction_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST AND QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReportRequest {
    pub prediction_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl SaveReportRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.prediction_id.is_none()
            || self.title.as_deref().map(str::trim).unwrap_or_default().is_empty()
        {
            return Err("Prediction ID and title are required fields".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ReportError {
    #[error("Report not found")]
    NotFound,

    #[error("Prediction not found")]
    PredictionNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to report")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
