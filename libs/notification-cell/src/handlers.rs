// libs/notification-cell/src/handlers.rs
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

use crate::models::{BroadcastRequest, NotificationError, NotificationListQuery};
use crate::services::notify::NotificationService;

fn map_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::NotFound => {
            AppError::NotFound("No notification found with that ID".to_string())
        }
        NotificationError::Unauthorized => AppError::Forbidden(
            "You are not authorized to access this notification".to_string(),
        ),
        NotificationError::ValidationError(msg) => AppError::BadRequest(msg),
        NotificationError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_my_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let listing = service
        .list_notifications(&user.id, &query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };

    Ok(Json(json!({
        "success": true,
        "count": listing.notifications.len(),
        "total": listing.total,
        "unread_count": listing.unread_count,
        "page": pagination.page(),
        "total_pages": pagination.total_pages(listing.total),
        "notifications": listing.notifications,
    })))
}

#[axum::debug_handler]
pub async fn get_unread_count(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let unread_count = service
        .unread_count(&user.id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "unread_count": unread_count,
    })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let notification = service
        .mark_as_read(notification_id, &user.id, auth.token())
        .await
        .map_err(|e| match e {
            NotificationError::Unauthorized => AppError::Forbidden(
                "You are not authorized to mark this notification as read".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "notification": notification,
    })))
}

#[axum::debug_handler]
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let updated = service
        .mark_all_as_read(&user.id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "message": "All notifications marked as read",
    })))
}

#[axum::debug_handler]
pub async fn delete_notification(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = NotificationService::new(&state);

    service
        .delete_notification(notification_id, &user.id, auth.token())
        .await
        .map_err(|e| match e {
            NotificationError::Unauthorized => AppError::Forbidden(
                "You are not authorized to delete this notification".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn delete_read_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&state);

    let deleted = service
        .delete_read(&user.id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "deleted": deleted,
        "message": "Read notifications deleted",
    })))
}

#[axum::debug_handler]
pub async fn broadcast_notification(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BroadcastRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.role.can_broadcast_notifications() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    let service = NotificationService::new(&state);

    let created = service
        .broadcast(&request, &user.id, auth.token())
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "created": created,
            "message": format!("Notification sent to {} users", created),
        })),
    ))
}

#[axum::debug_handler]
pub async fn purge_expired_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.role.can_broadcast_notifications() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    let service = NotificationService::new(&state);

    let purged = service.purge_expired(auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "purged": purged,
    })))
}
