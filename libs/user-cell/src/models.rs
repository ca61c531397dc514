// libs/user-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::UserRole;

// ==============================================================================
// DIRECTORY MODELS
// ==============================================================================

/// Directory row for an account. Credentials live with the identity
/// provider; this table carries only profile and role data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub specialization: Option<String>,
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

// Accounts are active unless explicitly deactivated, so rows that
// predate the column still count as active.
fn default_active() -> bool {
    true
}

/// Trimmed doctor row for the booking UI's doctor picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub specialization: Option<String>,
}

// ==============================================================================
// REQUEST AND QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub specialization: Option<String>,
    // Accepted only so they can be rejected with a pointed message.
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

impl UpdateUserRequest {
    pub fn touches_password(&self) -> bool {
        self.password.is_some() || self.password_confirm.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<UserRole>,
}

// ==============================================================================
// DASHBOARD STATS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCount {
    pub role: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCount {
    pub risk_level: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    pub total: usize,
    pub new: usize,
    pub active: usize,
    pub by_role: Vec<RoleCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionTotals {
    pub total: usize,
    pub new: usize,
    pub by_result: Vec<ResultCount>,
    pub by_risk: Vec<RiskCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentTotals {
    pub total: usize,
    pub new: usize,
    pub upcoming: usize,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub total: usize,
    pub public: usize,
}

/// Admin dashboard aggregate. `new` counts cover the trailing 30 days.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub users: UserTotals,
    pub predictions: PredictionTotals,
    pub appointments: AppointmentTotals,
    pub reports: ReportTotals,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("This route is not for password updates.")]
    PasswordUpdateRejected,

    #[error("Unauthorized access to user record")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
