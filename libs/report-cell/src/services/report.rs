// libs/report-cell/src/services/report.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};
use shared_models::auth::User;
use shared_models::pagination::PaginationQuery;

use crate::models::{
    ReportError, ReportListQuery, SaveReportRequest, SavedReport, UpdateReportRequest,
};

/// Saved-report store. Saving is an upsert keyed on (user, prediction):
/// the second save of the same prediction updates the existing row
/// instead of duplicating it.
pub struct ReportService {
    supabase: SupabaseClient,
}

impl ReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Returns the saved row and whether it was newly created, so the
    /// handler can answer 201 for a create and 200 for an update.
    pub async fn save(
        &self,
        user: &User,
        request: &SaveReportRequest,
        auth_token: &str,
    ) -> Result<(SavedReport, bool), ReportError> {
        request.validate().map_err(ReportError::ValidationError)?;

        // validate() guarantees the id is present.
        let prediction_id = request.prediction_id.unwrap_or_default();
        self.verify_prediction_owner(prediction_id, user, auth_token).await?;

        let path = format!(
            "/rest/v1/saved_reports?user_id=eq.{}&prediction_id=eq.{}",
            user.id, prediction_id,
        );
        let existing: Vec<SavedReport> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        if let Some(report) = existing.into_iter().next() {
            let updated = self
                .apply_update(report.id, &UpdateReportRequest {
                    title: request.title.clone(),
                    description: request.description.clone(),
                    tags: request.tags.clone(),
                    is_public: request.is_public,
                }, auth_token)
                .await?;
            debug!("Refreshed saved report {} for user {}", updated.id, user.id);
            return Ok((updated, false));
        }

        let body = json!({
            "id": Uuid::new_v4(),
            "user_id": user.id,
            "prediction_id": prediction_id,
            "title": request.title.as_deref().unwrap_or_default().trim(),
            "description": request.description,
            "tags": request.tags.clone().unwrap_or_default(),
            "is_public": request.is_public.unwrap_or(false),
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let created: Vec<SavedReport> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/saved_reports",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        let report = created.into_iter().next().ok_or_else(|| {
            ReportError::DatabaseError("saved report row not returned".to_string())
        })?;
        debug!("Created saved report {} for user {}", report.id, user.id);
        Ok((report, true))
    }

    pub async fn get_report(
        &self,
        report_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<SavedReport, ReportError> {
        let report = self.fetch(report_id, auth_token).await?;

        if report.user_id.to_string() != user.id && !report.is_public && !user.is_admin() {
            return Err(ReportError::Unauthorized);
        }

        Ok(report)
    }

    pub async fn list_mine(
        &self,
        user_id: &str,
        query: &ReportListQuery,
        auth_token: &str,
    ) -> Result<(Vec<SavedReport>, usize), ReportError> {
        let mut parts = vec![format!("user_id=eq.{}", user_id)];
        if let Some(search) = search_filter(query.search.as_deref()) {
            parts.push(search);
        }
        self.list(parts.join("&"), query, auth_token).await
    }

    pub async fn recent(&self, user_id: &str, auth_token: &str)
        -> Result<Vec<SavedReport>, ReportError> {
        let path = format!(
            "/rest/v1/saved_reports?user_id=eq.{}&order=created_at.desc&limit=3",
            user_id,
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReportError::DatabaseError(e.to_string()))
    }

    pub async fn list_public(
        &self,
        query: &ReportListQuery,
        auth_token: &str,
    ) -> Result<(Vec<SavedReport>, usize), ReportError> {
        let mut parts = vec!["is_public=eq.true".to_string()];
        if let Some(search) = search_filter(query.search.as_deref()) {
            parts.push(search);
        }
        self.list(parts.join("&"), query, auth_token).await
    }

    pub async fn update_report(
        &self,
        report_id: Uuid,
        request: &UpdateReportRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<SavedReport, ReportError> {
        let report = self.fetch(report_id, auth_token).await?;

        if report.user_id.to_string() != user.id && !user.is_admin() {
            return Err(ReportError::Unauthorized);
        }

        self.apply_update(report_id, request, auth_token).await
    }

    pub async fn delete_report(
        &self,
        report_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<(), ReportError> {
        let report = self.fetch(report_id, auth_token).await?;

        if report.user_id.to_string() != user.id && !user.is_admin() {
            return Err(ReportError::Unauthorized);
        }

        let path = format!("/rest/v1/saved_reports?id=eq.{}", report_id);
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await
        .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn apply_update(
        &self,
        report_id: Uuid,
        request: &UpdateReportRequest,
        auth_token: &str,
    ) -> Result<SavedReport, ReportError> {
        let mut fields = serde_json::Map::new();
        if let Some(title) = &request.title {
            fields.insert("title".to_string(), json!(title.trim()));
        }
        if let Some(description) = &request.description {
            fields.insert("description".to_string(), json!(description));
        }
        if let Some(tags) = &request.tags {
            fields.insert("tags".to_string(), json!(tags));
        }
        if let Some(is_public) = request.is_public {
            fields.insert("is_public".to_string(), json!(is_public));
        }
        fields.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/saved_reports?id=eq.{}", report_id);
        let updated: Vec<SavedReport> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(fields)),
            Some(return_representation()),
        ).await
        .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        updated.into_iter().next().ok_or(ReportError::NotFound)
    }

    async fn list(
        &self,
        filter: String,
        query: &ReportListQuery,
        auth_token: &str,
    ) -> Result<(Vec<SavedReport>, usize), ReportError> {
        let pagination = PaginationQuery { page: query.page, limit: query.limit };

        let path = format!(
            "/rest/v1/saved_reports?order=created_at.desc&limit={}&offset={}&{}",
            pagination.limit(),
            pagination.offset(),
            filter,
        );

        let reports: Vec<SavedReport> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        let total = self.supabase
            .count_rows("saved_reports", Some(&filter), Some(auth_token))
            .await
            .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        Ok((reports, total))
    }

    async fn fetch(&self, report_id: Uuid, auth_token: &str)
        -> Result<SavedReport, ReportError> {
        let path = format!("/rest/v1/saved_reports?id=eq.{}", report_id);

        let rows: Vec<SavedReport> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(ReportError::NotFound)
    }

    /// Only the prediction's owner (or an admin) may bookmark it.
    async fn verify_prediction_owner(
        &self,
        prediction_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<(), ReportError> {
        let path = format!(
            "/rest/v1/predictions?select=id,user_id&id=eq.{}",
            prediction_id,
        );

        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReportError::DatabaseError(e.to_string()))?;

        let prediction = rows.into_iter().next().ok_or(ReportError::PredictionNotFound)?;

        let owner = prediction.get("user_id").and_then(Value::as_str).unwrap_or_default();
        if owner != user.id && !user.is_admin() {
            return Err(ReportError::Unauthorized);
        }
        Ok(())
    }
}

/// Case-insensitive match over title, description and tags, in one
/// PostgREST `or` clause.
fn search_filter(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let clause = format!(
        "(title.ilike.*{t}*,description.ilike.*{t}*,tags.cs.{{{t}}})",
        t = term,
    );
    Some(format!("or={}", urlencoding::encode(&clause)))
}
