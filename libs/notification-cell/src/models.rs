// libs/notification-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PredictionResult,
    AppointmentReminder,
    AppointmentConfirmation,
    AppointmentCancellation,
    SystemAlert,
    AccountUpdate,
    NewMessage,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationType::PredictionResult => "prediction_result",
            NotificationType::AppointmentReminder => "appointment_reminder",
            NotificationType::AppointmentConfirmation => "appointment_confirmation",
            NotificationType::AppointmentCancellation => "appointment_cancellation",
            NotificationType::SystemAlert => "system_alert",
            NotificationType::AccountUpdate => "account_update",
            NotificationType::NewMessage => "new_message",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Entity a notification points back at. Names match what the clients
/// already store alongside `related_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelatedModel {
    Prediction,
    Appointment,
    User,
    SavedReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub priority: NotificationPriority,
    pub link: Option<String>,
    pub related_model: Option<RelatedModel>,
    pub related_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Optional attributes accepted by the producer, mirroring what the
/// event sources set: priority, deep link, related entity, expiry.
#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    pub sender_id: Option<Uuid>,
    pub priority: NotificationPriority,
    pub link: Option<String>,
    pub related_model: Option<RelatedModel>,
    pub related_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub read: Option<bool>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
}

/// Broadcast target: the literal `"all"`, a role name, or an explicit
/// list of user ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BroadcastRecipients {
    Ids(Vec<Uuid>),
    Keyword(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRequest {
    pub recipients: BroadcastRecipients,
    pub title: String,
    pub message: String,
    pub priority: Option<NotificationPriority>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Unauthorized access to notification")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
