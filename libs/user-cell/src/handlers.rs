// libs/user-cell/src/handlers.rs
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

use crate::models::{UpdateUserRequest, UserError, UserListQuery};
use crate::services::directory::DirectoryService;
use crate::services::stats::StatsService;

fn map_error(e: UserError) -> AppError {
    match e {
        UserError::NotFound => AppError::NotFound("No user found with that ID".to_string()),
        UserError::PasswordUpdateRejected => AppError::BadRequest(e.to_string()),
        UserError::Unauthorized => AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ),
        UserError::ValidationError(msg) => AppError::BadRequest(msg),
        UserError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if !user.role.can_manage_users() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn get_me(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);

    let profile = service
        .get_profile(&user.id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
    })))
}

#[axum::debug_handler]
pub async fn get_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(&state);

    let doctors = service.list_doctors(auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "count": doctors.len(),
        "doctors": doctors,
    })))
}

#[axum::debug_handler]
pub async fn get_all_users(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DirectoryService::new(&state);

    let (users, total) = service
        .list_users(&query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    Ok(Json(json!({
        "success": true,
        "count": users.len(),
        "total": total,
        "page": pagination.page(),
        "total_pages": pagination.total_pages(total),
        "users": users,
    })))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.id != user_id.to_string() {
        require_admin(&user)?;
    }

    let service = DirectoryService::new(&state);

    let profile = service
        .get_profile(&user_id.to_string(), auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
    })))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DirectoryService::new(&state);

    let profile = service
        .update_user(user_id, &request, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
    })))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    let service = DirectoryService::new(&state);

    service
        .delete_user(user_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn get_dashboard_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = StatsService::new(&state);

    let stats = service.dashboard(auth.token()).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "stats": stats,
    })))
}
