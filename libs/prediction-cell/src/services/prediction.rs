// libs/prediction-cell/src/services/prediction.rs
use std::collections::BTreeMap;

use chrono::{Datelike, Utc};
use reqwest::Method;
use serde_json::json;
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
    CreatePredictionRequest, LabelStat, MonthlyStat, Prediction, PredictionError,
    PredictionListQuery, PredictionResult, PredictionStats, PredictionStatus,
    ReviewPredictionRequest, RiskStat,
};
use crate::services::inference::InferenceClient;
use crate::services::risk;

/// Orchestrates the prediction lifecycle: persist a pending row, call
/// the classifier, finalize the row as completed or failed, and notify
/// the owner. Listing, review and stats live here too.
pub struct PredictionService {
    supabase: SupabaseClient,
    inference: InferenceClient,
    notifications: NotificationService,
}

impl PredictionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            inference: InferenceClient::new(config),
            notifications: NotificationService::new(config),
        }
    }

    /// Runs the full prediction workflow. The pending row is written
    /// before the classifier is called so a crash or timeout still
    /// leaves an auditable record, which then moves to `failed`.
    pub async fn create_prediction(
        &self,
        user_id: &str,
        request: CreatePredictionRequest,
        auth_token: &str,
    ) -> Result<Prediction, PredictionError> {
        let owner = Uuid::parse_str(user_id)
            .map_err(|_| PredictionError::ValidationError("Invalid user id".to_string()))?;

        request.patient_data.validate().map_err(PredictionError::ValidationError)?;

        let pending = self.insert_pending(owner, &request, auth_token).await?;
        debug!("Created pending prediction {}", pending.id);

        let inference = match self.inference.predict(&request.patient_data).await {
            Ok(inference) => inference,
            Err(e) => {
                self.mark_failed(pending.id, auth_token).await?;
                return Err(e);
            }
        };

        // The deployed model omits the risk fields, so the local
        // classifier fills them from label, probability and snapshot.
        let risk_level = inference.risk_level.unwrap_or_else(|| {
            risk::classify(&inference.prediction, inference.probability, &request.patient_data)
        });
        let risk_factors = inference.risk_factors.unwrap_or_else(|| {
            risk::aggravating_factors(&request.patient_data)
                .into_iter()
                .map(String::from)
                .collect()
        });

        let result = PredictionResult {
            prediction: inference.prediction,
            probability: inference.probability,
            risk_level,
            risk_factors,
            recommendations: inference.recommendations.unwrap_or_default(),
        };

        let completed = self.complete(pending.id, &result, auth_token).await?;

        let priority = if result.risk_level.is_elevated() {
            NotificationPriority::High
        } else {
            NotificationPriority::Normal
        };
        let options = NotificationOptions {
            priority,
            link: Some(format!("/prediction/{}", completed.id)),
            related_model: Some(RelatedModel::Prediction),
            related_id: Some(completed.id),
            ..Default::default()
        };
        if let Err(e) = self.notifications.create_notification(
            owner,
            NotificationType::PredictionResult,
            "Prediction Result Ready",
            "Your diabetes prediction result is now available.",
            options,
            auth_token,
        ).await {
            warn!("Failed to deliver prediction notification: {}", e);
        }

        Ok(completed)
    }

    pub async fn get_prediction(
        &self,
        prediction_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Prediction, PredictionError> {
        let prediction = self.fetch(prediction_id, auth_token).await?;

        if prediction.user_id.to_string() != user.id && !user.role.can_review_predictions() {
            return Err(PredictionError::Unauthorized);
        }

        Ok(prediction)
    }

    pub async fn list_user_predictions(
        &self,
        user_id: &str,
        query: &PredictionListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Prediction>, usize), PredictionError> {
        self.list(Some(user_id), query, auth_token).await
    }

    pub async fn list_all_predictions(
        &self,
        query: &PredictionListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Prediction>, usize), PredictionError> {
        self.list(None, query, auth_token).await
    }

    /// Applies reviewer annotations. Setting a status also stamps the
    /// reviewer and tells the owner their prediction was looked at.
    pub async fn review_prediction(
        &self,
        prediction_id: Uuid,
        request: &ReviewPredictionRequest,
        reviewer: &User,
        auth_token: &str,
    ) -> Result<Prediction, PredictionError> {
        let mut fields = serde_json::Map::new();
        if let Some(notes) = &request.notes {
            fields.insert("notes".to_string(), json!(notes));
        }
        if let Some(review_notes) = &request.review_notes {
            fields.insert("review_notes".to_string(), json!(review_notes));
        }
        if let Some(status) = request.status {
            fields.insert("status".to_string(), json!(status));
            fields.insert("reviewed_by".to_string(), json!(reviewer.id));
            fields.insert("reviewed_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/predictions?id=eq.{}", prediction_id);
        let updated: Vec<Prediction> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(serde_json::Value::Object(fields)),
            Some(return_representation()),
        ).await
        .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        let prediction = updated.into_iter().next().ok_or(PredictionError::NotFound)?;

        if matches!(request.status, Some(status) if status != PredictionStatus::Pending) {
            let options = NotificationOptions {
                link: Some(format!("/prediction/{}", prediction.id)),
                related_model: Some(RelatedModel::Prediction),
                related_id: Some(prediction.id),
                ..Default::default()
            };
            if let Err(e) = self.notifications.create_notification(
                prediction.user_id,
                NotificationType::PredictionResult,
                "Prediction Reviewed",
                "Your prediction has been reviewed by a healthcare professional.",
                options,
                auth_token,
            ).await {
                warn!("Failed to deliver review notification: {}", e);
            }
        }

        Ok(prediction)
    }

    pub async fn delete_prediction(
        &self,
        prediction_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<(), PredictionError> {
        let prediction = self.fetch(prediction_id, auth_token).await?;

        if prediction.user_id.to_string() != user.id && !user.is_admin() {
            return Err(PredictionError::Unauthorized);
        }

        let path = format!("/rest/v1/predictions?id=eq.{}", prediction_id);
        let _: Vec<serde_json::Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await
        .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Aggregates the whole table in memory: label and risk breakdowns
    /// over rows that carry a result, monthly totals over everything.
    pub async fn get_stats(&self, auth_token: &str) -> Result<PredictionStats, PredictionError> {
        let path = "/rest/v1/predictions?select=*&order=created_at.asc";
        let predictions: Vec<Prediction> = self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        let mut by_label: BTreeMap<String, (usize, f64, f64, f64)> = BTreeMap::new();
        let mut by_risk: BTreeMap<crate::models::RiskLevel, usize> = BTreeMap::new();
        let mut monthly: BTreeMap<(i32, u32), (usize, usize, usize, usize)> = BTreeMap::new();

        for prediction in &predictions {
            if let Some(result) = &prediction.result {
                let entry = by_label
                    .entry(result.prediction.clone())
                    .or_insert((0, 0.0, 0.0, 0.0));
                entry.0 += 1;
                entry.1 += prediction.patient_data.age as f64;
                entry.2 += prediction.patient_data.bmi;
                entry.3 += prediction.patient_data.glucose_level;

                *by_risk.entry(result.risk_level).or_insert(0) += 1;
            }

            let key = (prediction.created_at.year(), prediction.created_at.month());
            let bucket = monthly.entry(key).or_insert((0, 0, 0, 0));
            bucket.0 += 1;
            match prediction.result.as_ref().map(|r| r.prediction.as_str()) {
                Some("diabetic") => bucket.1 += 1,
                Some("non-diabetic") => bucket.2 += 1,
                Some("pre-diabetic") => bucket.3 += 1,
                _ => {}
            }
        }

        let mut label_stats: Vec<LabelStat> = by_label
            .into_iter()
            .map(|(label, (count, age_sum, bmi_sum, glucose_sum))| LabelStat {
                label,
                count,
                avg_age: Some(age_sum / count as f64),
                avg_bmi: Some(bmi_sum / count as f64),
                avg_glucose: Some(glucose_sum / count as f64),
            })
            .collect();
        label_stats.sort_by(|a, b| b.count.cmp(&a.count));

        let mut risk_stats: Vec<RiskStat> = by_risk
            .into_iter()
            .map(|(risk_level, count)| RiskStat { risk_level, count })
            .collect();
        risk_stats.sort_by(|a, b| b.count.cmp(&a.count));

        let monthly_stats: Vec<MonthlyStat> = monthly
            .into_iter()
            .map(|((year, month), (count, diabetic, non_diabetic, pre_diabetic))| MonthlyStat {
                year,
                month,
                count,
                diabetic,
                non_diabetic,
                pre_diabetic,
            })
            .collect();

        Ok(PredictionStats {
            by_label: label_stats,
            by_risk: risk_stats,
            monthly: monthly_stats,
        })
    }

    async fn insert_pending(
        &self,
        owner: Uuid,
        request: &CreatePredictionRequest,
        auth_token: &str,
    ) -> Result<Prediction, PredictionError> {
        let body = json!({
            "id": Uuid::new_v4(),
            "user_id": owner,
            "patient_data": request.patient_data,
            "result": null,
            "status": PredictionStatus::Pending,
            "notes": null,
            "reviewed_by": null,
            "reviewed_at": null,
            "review_notes": null,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created: Vec<Prediction> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/predictions",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        created.into_iter().next().ok_or_else(|| {
            PredictionError::DatabaseError("prediction row not returned".to_string())
        })
    }

    async fn complete(
        &self,
        prediction_id: Uuid,
        result: &PredictionResult,
        auth_token: &str,
    ) -> Result<Prediction, PredictionError> {
        let path = format!("/rest/v1/predictions?id=eq.{}", prediction_id);
        let body = json!({
            "result": result,
            "status": PredictionStatus::Completed,
        });

        let updated: Vec<Prediction> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        updated.into_iter().next().ok_or(PredictionError::NotFound)
    }

    async fn mark_failed(&self, prediction_id: Uuid, auth_token: &str)
        -> Result<(), PredictionError> {
        let path = format!("/rest/v1/predictions?id=eq.{}", prediction_id);
        let body = json!({ "status": PredictionStatus::Failed });

        let _: Vec<Prediction> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn fetch(&self, prediction_id: Uuid, auth_token: &str)
        -> Result<Prediction, PredictionError> {
        let path = format!("/rest/v1/predictions?id=eq.{}", prediction_id);

        let rows: Vec<Prediction> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(PredictionError::NotFound)
    }

    async fn list(
        &self,
        user_scope: Option<&str>,
        query: &PredictionListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Prediction>, usize), PredictionError> {
        let pagination = PaginationQuery { page: query.page, limit: query.limit };
        let filter = Self::list_filter(user_scope, query);

        let mut path = format!(
            "/rest/v1/predictions?order=created_at.desc&limit={}&offset={}",
            pagination.limit(),
            pagination.offset(),
        );
        if !filter.is_empty() {
            path.push('&');
            path.push_str(&filter);
        }

        let predictions: Vec<Prediction> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        let count_filter = if filter.is_empty() { None } else { Some(filter.as_str()) };
        let total = self.supabase
            .count_rows("predictions", count_filter, Some(auth_token))
            .await
            .map_err(|e| PredictionError::DatabaseError(e.to_string()))?;

        Ok((predictions, total))
    }

    fn list_filter(user_scope: Option<&str>, query: &PredictionListQuery) -> String {
        let mut parts = Vec::new();

        // A caller-bound listing ignores any user filter in the query.
        if let Some(user_id) = user_scope {
            parts.push(format!("user_id=eq.{}", user_id));
        } else if let Some(user) = query.user {
            parts.push(format!("user_id=eq.{}", user));
        }

        if let Some(status) = query.status {
            parts.push(format!("status=eq.{}", status));
        }
        if let Some(result) = &query.result {
            parts.push(format!(
                "result->>prediction=eq.{}",
                urlencoding::encode(result)
            ));
        }
        if let Some(risk_level) = query.risk_level {
            parts.push(format!(
                "result->>riskLevel=eq.{}",
                urlencoding::encode(&risk_level.to_string())
            ));
        }
        if let Some(start) = query.start_date {
            parts.push(format!(
                "created_at=gte.{}",
                urlencoding::encode(&start.to_rfc3339())
            ));
        }
        if let Some(end) = query.end_date {
            parts.push(format!(
                "created_at=lte.{}",
                urlencoding::encode(&end.to_rfc3339())
            ));
        }

        parts.join("&")
    }
}
