// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// STATUS AND TYPE ENUMS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
    #[serde(rename = "no-show")]
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled
                | AppointmentStatus::Completed
                | AppointmentStatus::NoShow
        )
    }

    /// Status state machine. Re-asserting the current status is always
    /// accepted as a no-op, so a repeated cancellation request succeeds
    /// without firing anything twice.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            AppointmentStatus::Scheduled => matches!(
                next,
                AppointmentStatus::Confirmed
                    | AppointmentStatus::Cancelled
                    | AppointmentStatus::NoShow
            ),
            AppointmentStatus::Confirmed => matches!(
                next,
                AppointmentStatus::Completed
                    | AppointmentStatus::Cancelled
                    | AppointmentStatus::NoShow
            ),
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => false,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no-show",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    #[default]
    Consultation,
    #[serde(rename = "follow-up")]
    FollowUp,
    Test,
    Other,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AppointmentType::Consultation => "consultation",
            AppointmentType::FollowUp => "follow-up",
            AppointmentType::Test => "test",
            AppointmentType::Other => "other",
        };
        write!(f, "{}", label)
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Stored appointment row. Times are `HH:MM` strings on a date-only
/// calendar day; minute arithmetic lives in the conflict service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub location: String,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rescheduled_from: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Free 30-minute interval offered by the slot generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

// ==============================================================================
// REQUEST AND QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(rename = "type", default)]
    pub appointment_type: AppointmentType,
    pub doctor_id: Option<Uuid>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub rescheduled_from: Option<Uuid>,
}

impl CreateAppointmentRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.date.is_none()
            || self.start_time.is_none()
            || self.end_time.is_none()
            || self.reason.as_deref().map(str::trim).unwrap_or_default().is_empty()
        {
            return Err("Date, time, and reason are required fields".to_string());
        }
        validate_interval(
            self.start_time.as_deref().unwrap_or_default(),
            self.end_time.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<AppointmentType>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub cancel_reason: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn changes_schedule(&self) -> bool {
        self.date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type")]
    pub appointment_type: Option<AppointmentType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user: Option<Uuid>,
    pub doctor: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub doctor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// TIME HELPERS
// ==============================================================================

/// Parses an `HH:MM` 24-hour string into minutes past midnight.
pub fn parse_minutes(time: &str) -> Option<u32> {
    let (hours, minutes) = time.split_once(':')?;
    if minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn validate_interval(start: &str, end: &str) -> Result<(), String> {
    let start_minutes = parse_minutes(start)
        .ok_or_else(|| "Please provide a valid time format (HH:MM)".to_string())?;
    let end_minutes = parse_minutes(end)
        .ok_or_else(|| "Please provide a valid time format (HH:MM)".to_string())?;
    if start_minutes >= end_minutes {
        return Err("Start time must be before end time".to_string());
    }
    Ok(())
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("The doctor is not available at the selected time. Please choose another time.")]
    Conflict,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
