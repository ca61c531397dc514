// libs/user-cell/src/services/stats.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentTotals, DashboardStats, PredictionTotals, ReportTotals, ResultCount, RiskCount,
    RoleCount, StatusCount, UserError, UserTotals,
};

const NEW_WINDOW_DAYS: i64 = 30;

// Slim projections for the aggregate fetches; the full rows are never
// needed here.
#[derive(Debug, Deserialize)]
struct UserRow {
    role: Option<String>,
    active: Option<bool>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    result: Option<Value>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AppointmentRow {
    status: Option<String>,
    date: Option<NaiveDate>,
    created_at: Option<DateTime<Utc>>,
}

/// Admin dashboard aggregation. Row counts are small enough at clinic
/// scale that grouping happens in memory over column projections.
pub struct StatsService {
    supabase: SupabaseClient,
}

impl StatsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn dashboard(&self, auth_token: &str) -> Result<DashboardStats, UserError> {
        let cutoff = Utc::now() - Duration::days(NEW_WINDOW_DAYS);
        let today = Utc::now().date_naive();

        let users: Vec<UserRow> = self
            .fetch("/rest/v1/users?select=role,active,created_at", auth_token)
            .await?;
        let predictions: Vec<PredictionRow> = self
            .fetch("/rest/v1/predictions?select=result,created_at", auth_token)
            .await?;
        let appointments: Vec<AppointmentRow> = self
            .fetch("/rest/v1/appointments?select=status,date,created_at", auth_token)
            .await?;

        let total_reports = self.supabase
            .count_rows("saved_reports", None, Some(auth_token))
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;
        let public_reports = self.supabase
            .count_rows("saved_reports", Some("is_public=eq.true"), Some(auth_token))
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        let stats = DashboardStats {
            users: Self::user_totals(&users, cutoff),
            predictions: Self::prediction_totals(&predictions, cutoff),
            appointments: Self::appointment_totals(&appointments, cutoff, today),
            reports: ReportTotals { total: total_reports, public: public_reports },
        };

        debug!(
            "Dashboard stats: {} users, {} predictions, {} appointments, {} reports",
            stats.users.total, stats.predictions.total,
            stats.appointments.total, stats.reports.total,
        );
        Ok(stats)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<T>, UserError> {
        self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))
    }

    fn user_totals(rows: &[UserRow], cutoff: DateTime<Utc>) -> UserTotals {
        let mut by_role: BTreeMap<String, usize> = BTreeMap::new();
        let mut new = 0;
        let mut active = 0;

        for row in rows {
            let role = row.role.clone().unwrap_or_else(|| "user".to_string());
            *by_role.entry(role).or_insert(0) += 1;
            if row.active.unwrap_or(true) {
                active += 1;
            }
            if row.created_at.is_some_and(|at| at >= cutoff) {
                new += 1;
            }
        }

        let mut by_role: Vec<RoleCount> = by_role
            .into_iter()
            .map(|(role, count)| RoleCount { role, count })
            .collect();
        by_role.sort_by(|a, b| b.count.cmp(&a.count));

        UserTotals { total: rows.len(), new, active, by_role }
    }

    fn prediction_totals(rows: &[PredictionRow], cutoff: DateTime<Utc>) -> PredictionTotals {
        let mut by_result: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_risk: BTreeMap<String, usize> = BTreeMap::new();
        let mut new = 0;

        for row in rows {
            if let Some(result) = &row.result {
                if let Some(label) = result.get("prediction").and_then(Value::as_str) {
                    *by_result.entry(label.to_string()).or_insert(0) += 1;
                }
                if let Some(risk) = result.get("riskLevel").and_then(Value::as_str) {
                    *by_risk.entry(risk.to_string()).or_insert(0) += 1;
                }
            }
            if row.created_at.is_some_and(|at| at >= cutoff) {
                new += 1;
            }
        }

        let mut by_result: Vec<ResultCount> = by_result
            .into_iter()
            .map(|(label, count)| ResultCount { label, count })
            .collect();
        by_result.sort_by(|a, b| b.count.cmp(&a.count));

        let mut by_risk: Vec<RiskCount> = by_risk
            .into_iter()
            .map(|(risk_level, count)| RiskCount { risk_level, count })
            .collect();
        by_risk.sort_by(|a, b| b.count.cmp(&a.count));

        PredictionTotals { total: rows.len(), new, by_result, by_risk }
    }

    fn appointment_totals(
        rows: &[AppointmentRow],
        cutoff: DateTime<Utc>,
        today: NaiveDate,
    ) -> AppointmentTotals {
        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut new = 0;
        let mut upcoming = 0;

        for row in rows {
            let status = row.status.clone().unwrap_or_else(|| "scheduled".to_string());
            if row.date.is_some_and(|date| date >= today)
                && matches!(status.as_str(), "scheduled" | "confirmed")
            {
                upcoming += 1;
            }
            *by_status.entry(status).or_insert(0) += 1;
            if row.created_at.is_some_and(|at| at >= cutoff) {
                new += 1;
            }
        }

        let mut by_status: Vec<StatusCount> = by_status
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();
        by_status.sort_by(|a, b| b.count.cmp(&a.count));

        AppointmentTotals { total: rows.len(), new, upcoming, by_status }
    }
}
