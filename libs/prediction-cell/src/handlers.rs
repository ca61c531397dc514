// libs/prediction-cell/src/handlers.rs
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

use crate::models::{
    CreatePredictionRequest, Prediction, PredictionError, PredictionListQuery,
    ReviewPredictionRequest,
};
use crate::services::prediction::PredictionService;

fn map_error(e: PredictionError) -> AppError {
    match e {
        PredictionError::NotFound => {
            AppError::NotFound("No prediction found with that ID".to_string())
        }
        PredictionError::ValidationError(msg) => AppError::BadRequest(msg),
        PredictionError::Unauthorized => AppError::Forbidden(
            "You are not authorized to access this prediction".to_string(),
        ),
        PredictionError::ClassifierUnavailable(_) | PredictionError::ClassifierTimeout => {
            AppError::Timeout(
                "Failed to process prediction. ML server may be offline or slow.".to_string(),
            )
        }
        PredictionError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn listing_response(predictions: Vec<Prediction>, total: usize,
                    pagination: &PaginationQuery) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": predictions.len(),
        "total": total,
        "page": pagination.page(),
        "total_pages": pagination.total_pages(total),
        "predictions": predictions,
    }))
}

#[axum::debug_handler]
pub async fn create_prediction(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePredictionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PredictionService::new(&state);

    let prediction = service
        .create_prediction(&user.id, request, auth.token())
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "prediction": prediction,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_my_predictions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PredictionListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PredictionService::new(&state);

    let (predictions, total) = service
        .list_user_predictions(&user.id, &query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    Ok(listing_response(predictions, total, &pagination))
}

#[axum::debug_handler]
pub async fn get_all_predictions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PredictionListQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.role.can_review_predictions() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    let service = PredictionService::new(&state);

    let (predictions, total) = service
        .list_all_predictions(&query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    Ok(listing_response(predictions, total, &pagination))
}

#[axum::debug_handler]
pub async fn get_prediction(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(prediction_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PredictionService::new(&state);

    let prediction = service
        .get_prediction(prediction_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            PredictionError::Unauthorized => AppError::Forbidden(
                "You are not authorized to view this prediction".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "prediction": prediction,
    })))
}

#[axum::debug_handler]
pub async fn review_prediction(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(prediction_id): Path<Uuid>,
    Json(request): Json<ReviewPredictionRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.role.can_review_predictions() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    let service = PredictionService::new(&state);

    let prediction = service
        .review_prediction(prediction_id, &request, &user, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "prediction": prediction,
    })))
}

#[axum::debug_handler]
pub async fn delete_prediction(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(prediction_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = PredictionService::new(&state);

    service
        .delete_prediction(prediction_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            PredictionError::Unauthorized => AppError::Forbidden(
                "You are not authorized to delete this prediction".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn get_prediction_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.role.can_review_predictions() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    let service = PredictionService::new(&state);

    let stats = service.get_stats(auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "stats": stats,
    })))
}
