// libs/report-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::pagination::PaginationQuery;

use crate::models::{ReportError, ReportListQuery, SaveReportRequest, SavedReport, UpdateReportRequest};
use crate::services::report::ReportService;

fn map_error(e: ReportError) -> AppError {
    match e {
        ReportError::NotFound => AppError::NotFound("No report found with that ID".to_string()),
        ReportError::PredictionNotFound => {
            AppError::NotFound("No prediction found with that ID".to_string())
        }
        ReportError::ValidationError(msg) => AppError::BadRequest(msg),
        ReportError::Unauthorized => AppError::Forbidden(
            "You are not authorized to access this report".to_string(),
        ),
        ReportError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn listing_response(reports: Vec<SavedReport>, total: usize,
                    pagination: &PaginationQuery) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": reports.len(),
        "total": total,
        "page": pagination.page(),
        "total_pages": pagination.total_pages(total),
        "reports": reports,
    }))
}

#[axum::debug_handler]
pub async fn save_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SaveReportRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ReportService::new(&state);

    let (report, created) = service
        .save(&user, &request, auth.token())
        .await
        .map_err(|e| match e {
            ReportError::Unauthorized => AppError::Forbidden(
                "You are not authorized to save this prediction".to_string(),
            ),
            other => map_error(other),
        })?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({
            "success": true,
            "report": report,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_my_reports(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ReportService::new(&state);

    let (reports, total) = service
        .list_mine(&user.id, &query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    Ok(listing_response(reports, total, &pagination))
}

#[axum::debug_handler]
pub async fn get_recent_reports(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ReportService::new(&state);

    let reports = service.recent(&user.id, auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "count": reports.len(),
        "reports": reports,
    })))
}

#[axum::debug_handler]
pub async fn get_public_reports(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ReportService::new(&state);

    let (reports, total) = service
        .list_public(&query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    Ok(listing_response(reports, total, &pagination))
}

#[axum::debug_handler]
pub async fn get_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ReportService::new(&state);

    let report = service
        .get_report(report_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            ReportError::Unauthorized => AppError::Forbidden(
                "You are not authorized to view this report".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "report": report,
    })))
}

#[axum::debug_handler]
pub async fn update_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(report_id): Path<Uuid>,
    Json(request): Json<UpdateReportRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReportService::new(&state);

    let report = service
        .update_report(report_id, &request, &user, auth.token())
        .await
        .map_err(|e| match e {
            ReportError::Unauthorized => AppError::Forbidden(
                "You are not authorized to update this report".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "report": report,
    })))
}

#[axum::debug_handler]
pub async fn delete_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(report_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = ReportService::new(&state);

    service
        .delete_report(report_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            ReportError::Unauthorized => AppError::Forbidden(
                "You are not authorized to delete this report".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
