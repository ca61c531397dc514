// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{parse_minutes, Appointment, AppointmentError};

/// Detects double-bookings for a doctor on a calendar day. The check is
/// read-then-write without a datastore constraint, so two requests
/// racing past it can still both land; see DESIGN.md.
pub struct ConflictService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start: &str,
        end: &str,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let start_minutes = parse_minutes(start).ok_or_else(|| {
            AppointmentError::ValidationError("Please provide a valid time format (HH:MM)".to_string())
        })?;
        let end_minutes = parse_minutes(end).ok_or_else(|| {
            AppointmentError::ValidationError("Please provide a valid time format (HH:MM)".to_string())
        })?;

        let existing = active_appointments_for_day(
            &self.supabase,
            doctor_id,
            date,
            exclude_appointment_id,
            auth_token,
        ).await?;

        for appointment in &existing {
            let (existing_start, existing_end) = match parse_minutes(&appointment.start_time)
                .zip(parse_minutes(&appointment.end_time))
            {
                Some(minutes) => minutes,
                None => {
                    warn!("Appointment {} has an unparseable time, skipping", appointment.id);
                    continue;
                }
            };

            if intervals_overlap(start_minutes, end_minutes, existing_start, existing_end) {
                debug!(
                    "Conflict for doctor {} on {}: {}-{} overlaps appointment {}",
                    doctor_id, date, start, end, appointment.id
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Half-open interval overlap: a shared boundary minute is not a
/// conflict, so back-to-back appointments are fine.
pub fn intervals_overlap(start: u32, end: u32, existing_start: u32, existing_end: u32) -> bool {
    (start >= existing_start && start < existing_end)
        || (end > existing_start && end <= existing_end)
        || (start <= existing_start && end >= existing_end)
}

/// Appointments still holding the doctor's time on that day. Cancelled
/// and no-show rows release their slot.
pub async fn active_appointments_for_day(
    supabase: &SupabaseClient,
    doctor_id: Uuid,
    date: NaiveDate,
    exclude_appointment_id: Option<Uuid>,
    auth_token: &str,
) -> Result<Vec<Appointment>, AppointmentError> {
    let mut path = format!(
        "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&status=not.in.{}",
        doctor_id,
        date.format("%Y-%m-%d"),
        urlencoding::encode("(cancelled,no-show)"),
    );
    if let Some(exclude) = exclude_appointment_id {
        path.push_str(&format!("&id=neq.{}", exclude));
    }

    supabase
        .request(Method::GET, &path, Some(auth_token), None)
        .await
        .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
}
