// libs/appointment-cell/src/services/slots.rs
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{parse_minutes, AppointmentError, TimeSlot};
use crate::services::conflict::{active_appointments_for_day, intervals_overlap};

const OPEN_HOUR: u32 = 9;
const CLOSE_HOUR: u32 = 17;
const SLOT_MINUTES: u32 = 30;

/// Generates the free 30-minute slots of a doctor's clinic day
/// (09:00 to 17:00), dropping every slot that overlaps an active
/// appointment.
pub struct SlotService {
    supabase: SupabaseClient,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, AppointmentError> {
        self.verify_doctor(doctor_id, auth_token).await?;

        let appointments = active_appointments_for_day(
            &self.supabase,
            doctor_id,
            date,
            None,
            auth_token,
        ).await?;

        let busy: Vec<(u32, u32)> = appointments
            .iter()
            .filter_map(|a| parse_minutes(&a.start_time).zip(parse_minutes(&a.end_time)))
            .collect();

        let mut slots = Vec::new();
        let mut start = OPEN_HOUR * 60;
        let close = CLOSE_HOUR * 60;
        while start + SLOT_MINUTES <= close {
            let end = start + SLOT_MINUTES;
            let taken = busy
                .iter()
                .any(|&(existing_start, existing_end)| {
                    intervals_overlap(start, end, existing_start, existing_end)
                });
            if !taken {
                slots.push(TimeSlot {
                    start: format_minutes(start),
                    end: format_minutes(end),
                });
            }
            start = end;
        }

        debug!(
            "Doctor {} has {} free slots on {}",
            doctor_id,
            slots.len(),
            date
        );
        Ok(slots)
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
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
