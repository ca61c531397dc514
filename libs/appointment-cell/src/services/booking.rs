// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use notification_cell::models::{
    NotificationOptions, NotificationPriority, NotificationType, RelatedModel,
};
use notification_cell::services::notify::NotificationService;
use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};
use shared_models::auth::User;
use shared_models::pagination::PaginationQuery;

use crate::models::{
    validate_interval, Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictService;

/// Appointment lifecycle manager: create, read, update (with the status
/// state machine), delete and the two listing paths. Writes go through
/// the conflict checker first; notification fan-out never fails the
/// primary operation.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    conflict: ConflictService,
    notifications: NotificationService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let conflict = ConflictService::new(Arc::clone(&supabase));
        let notifications = NotificationService::new(config);

        Self { supabase, conflict, notifications }
    }

    pub async fn create_appointment(
        &self,
        user_id: &str,
        request: &CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        request.validate().map_err(AppointmentError::ValidationError)?;

        let owner = Uuid::parse_str(user_id)
            .map_err(|_| AppointmentError::ValidationError("Invalid user id".to_string()))?;

        // validate() guarantees these are present.
        let date = request.date.unwrap_or_default();
        let start = request.start_time.clone().unwrap_or_default();
        let end = request.end_time.clone().unwrap_or_default();

        if let Some(doctor_id) = request.doctor_id {
            self.verify_doctor(doctor_id, auth_token).await?;

            let conflicted = self.conflict
                .has_conflict(doctor_id, date, &start, &end, None, auth_token)
                .await?;
            if conflicted {
                return Err(AppointmentError::Conflict);
            }
        }

        let body = json!({
            "id": Uuid::new_v4(),
            "user_id": owner,
            "doctor_id": request.doctor_id,
            "date": date.format("%Y-%m-%d").to_string(),
            "start_time": start,
            "end_time": end,
            "appointment_type": request.appointment_type,
            "status": AppointmentStatus::Scheduled,
            "reason": request.reason.as_deref().unwrap_or_default().trim(),
            "notes": request.notes,
            "location": request.location.as_deref().unwrap_or("Main Clinic"),
            "cancel_reason": null,
            "cancelled_by": null,
            "cancelled_at": null,
            "rescheduled_from": request.rescheduled_from,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = created.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("appointment row not returned".to_string())
        })?;
        debug!("Created appointment {} for user {}", appointment.id, owner);

        self.notify_scheduled(&appointment, auth_token).await;

        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.fetch(appointment_id, auth_token).await?;

        if !Self::can_access(&appointment, user) {
            return Err(AppointmentError::Unauthorized);
        }

        Ok(appointment)
    }

    /// Applies an update under the status state machine. A transition
    /// into `cancelled` stamps the canceller and fires one cancellation
    /// notification pair; repeating the same status is a no-op and
    /// fires nothing.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: &UpdateAppointmentRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.fetch(appointment_id, auth_token).await?;

        if !Self::can_access(&existing, user) {
            return Err(AppointmentError::Unauthorized);
        }

        if let Some(next) = request.status {
            if !existing.status.can_transition_to(next) {
                return Err(AppointmentError::InvalidTransition {
                    from: existing.status,
                    to: next,
                });
            }
        }

        let date = request.date.unwrap_or(existing.date);
        let start = request.start_time.as_deref().unwrap_or(&existing.start_time);
        let end = request.end_time.as_deref().unwrap_or(&existing.end_time);

        if request.changes_schedule() {
            validate_interval(start, end).map_err(AppointmentError::ValidationError)?;

            if let Some(doctor_id) = existing.doctor_id {
                if existing.status != AppointmentStatus::Cancelled {
                    let conflicted = self.conflict
                        .has_conflict(doctor_id, date, start, end, Some(existing.id), auth_token)
                        .await?;
                    if conflicted {
                        return Err(AppointmentError::Conflict);
                    }
                }
            }
        }

        let cancelling = request.status == Some(AppointmentStatus::Cancelled)
            && existing.status != AppointmentStatus::Cancelled;

        let mut fields = serde_json::Map::new();
        if let Some(date) = request.date {
            fields.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(start_time) = &request.start_time {
            fields.insert("start_time".to_string(), json!(start_time));
        }
        if let Some(end_time) = &request.end_time {
            fields.insert("end_time".to_string(), json!(end_time));
        }
        if let Some(appointment_type) = request.appointment_type {
            fields.insert("appointment_type".to_string(), json!(appointment_type));
        }
        if let Some(status) = request.status {
            fields.insert("status".to_string(), json!(status));
        }
        if let Some(reason) = &request.reason {
            fields.insert("reason".to_string(), json!(reason.trim()));
        }
        if let Some(notes) = &request.notes {
            fields.insert("notes".to_string(), json!(notes));
        }
        if let Some(location) = &request.location {
            fields.insert("location".to_string(), json!(location));
        }
        if let Some(cancel_reason) = &request.cancel_reason {
            fields.insert("cancel_reason".to_string(), json!(cancel_reason));
        }
        if cancelling {
            fields.insert("cancelled_by".to_string(), json!(user.id));
            fields.insert("cancelled_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(fields)),
            Some(return_representation()),
        ).await
        .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = updated.into_iter().next().ok_or(AppointmentError::NotFound)?;

        if cancelling {
            // Messages carry the slot as it stood before the update.
            self.notify_cancelled(&existing, auth_token).await;
        }

        Ok(appointment)
    }

    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let appointment = self.fetch(appointment_id, auth_token).await?;

        if appointment.user_id.to_string() != user.id && !user.is_admin() {
            return Err(AppointmentError::Unauthorized);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await
        .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub async fn list_user_appointments(
        &self,
        user_id: &str,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, usize), AppointmentError> {
        let mut parts = vec![format!("user_id=eq.{}", user_id)];
        Self::push_common_filters(&mut parts, query);
        self.list(parts.join("&"), query, auth_token).await
    }

    /// Admin sees everything; a doctor is pinned to their own calendar
    /// regardless of any `doctor` filter in the query.
    pub async fn list_all_appointments(
        &self,
        user: &User,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, usize), AppointmentError> {
        let mut parts = Vec::new();

        if user.is_doctor() {
            parts.push(format!("doctor_id=eq.{}", user.id));
        } else if let Some(doctor) = query.doctor {
            parts.push(format!("doctor_id=eq.{}", doctor));
        }
        if let Some(user_filter) = query.user {
            parts.push(format!("user_id=eq.{}", user_filter));
        }
        Self::push_common_filters(&mut parts, query);

        self.list(parts.join("&"), query, auth_token).await
    }

    fn push_common_filters(parts: &mut Vec<String>, query: &AppointmentListQuery) {
        if let Some(status) = query.status {
            parts.push(format!("status=eq.{}", status));
        }
        if let Some(appointment_type) = query.appointment_type {
            parts.push(format!("appointment_type=eq.{}", appointment_type));
        }
        if let Some(start_date) = query.start_date {
            parts.push(format!("date=gte.{}", start_date.format("%Y-%m-%d")));
        }
        if let Some(end_date) = query.end_date {
            parts.push(format!("date=lte.{}", end_date.format("%Y-%m-%d")));
        }
    }

    async fn list(
        &self,
        filter: String,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, usize), AppointmentError> {
        let pagination = PaginationQuery { page: query.page, limit: query.limit };

        let mut path = format!(
            "/rest/v1/appointments?order=date.asc,start_time.asc&limit={}&offset={}",
            pagination.limit(),
            pagination.offset(),
        );
        if !filter.is_empty() {
            path.push('&');
            path.push_str(&filter);
        }

        let appointments: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let count_filter = if filter.is_empty() { None } else { Some(filter.as_str()) };
        let total = self.supabase
            .count_rows("appointments", count_filter, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok((appointments, total))
    }

    async fn fetch(&self, appointment_id: Uuid, auth_token: &str)
        -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let rows: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    async fn verify_doctor(&self, doctor_id: Uuid, auth_token: &str)
        -> Result<(), AppointmentError> {
        let path = format!(
            "/rest/v1/users?select=id&id=eq.{}&role=eq.doctor",
            doctor_id
        );

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(AppointmentError::DoctorNotFound);
        }
        Ok(())
    }

    fn can_access(appointment: &Appointment, user: &User) -> bool {
        appointment.user_id.to_string() == user.id
            || appointment.doctor_id.map(|id| id.to_string()) == Some(user.id.clone())
            || user.is_admin()
    }

    fn appointment_options(appointment: &Appointment) -> NotificationOptions {
        NotificationOptions {
            priority: NotificationPriority::High,
            link: Some(format!("/appointment/{}", appointment.id)),
            related_model: Some(RelatedModel::Appointment),
            related_id: Some(appointment.id),
            ..Default::default()
        }
    }

    async fn notify_scheduled(&self, appointment: &Appointment, auth_token: &str) {
        let date = appointment.date.format("%Y-%m-%d");

        if let Err(e) = self.notifications.create_notification(
            appointment.user_id,
            NotificationType::AppointmentConfirmation,
            "Appointment Scheduled",
            &format!(
                "Your appointment has been scheduled for {} at {}.",
                date, appointment.start_time
            ),
            Self::appointment_options(appointment),
            auth_token,
        ).await {
            warn!("Failed to deliver booking notification: {}", e);
        }

        if let Some(doctor_id) = appointment.doctor_id {
            if let Err(e) = self.notifications.create_notification(
                doctor_id,
                NotificationType::AppointmentConfirmation,
                "New Appointment",
                &format!(
                    "A new appointment has been scheduled with you for {} at {}.",
                    date, appointment.start_time
                ),
                Self::appointment_options(appointment),
                auth_token,
            ).await {
                warn!("Failed to deliver booking notification to doctor: {}", e);
            }
        }
    }

    async fn notify_cancelled(&self, appointment: &Appointment, auth_token: &str) {
        let date = appointment.date.format("%Y-%m-%d");

        if let Err(e) = self.notifications.create_notification(
            appointment.user_id,
            NotificationType::AppointmentCancellation,
            "Appointment Cancelled",
            &format!(
                "Your appointment scheduled for {} at {} has been cancelled.",
                date, appointment.start_time
            ),
            Self::appointment_options(appointment),
            auth_token,
        ).await {
            warn!("Failed to deliver cancellation notification: {}", e);
        }

        if let Some(doctor_id) = appointment.doctor_id {
            if let Err(e) = self.notifications.create_notification(
                doctor_id,
                NotificationType::AppointmentCancellation,
                "Appointment Cancelled",
                &format!(
                    "The appointment scheduled for {} at {} has been cancelled.",
                    date, appointment.start_time
                ),
                Self::appointment_options(appointment),
                auth_token,
            ).await {
                warn!("Failed to deliver cancellation notification to doctor: {}", e);
            }
        }
    }
}
