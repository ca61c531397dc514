// libs/appointment-cell/src/handlers.rs
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
    Appointment, AppointmentError, AppointmentListQuery, CreateAppointmentRequest,
    SlotQuery, UpdateAppointmentRequest,
};
use crate::services::booking::BookingService;
use crate::services::slots::SlotService;

fn map_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => {
            AppError::NotFound("No appointment found with that ID".to_string())
        }
        AppointmentError::DoctorNotFound => {
            AppError::NotFound("No doctor found with that ID".to_string())
        }
        AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
        // Slot clashes surface as a plain 400, matching what booking
        // clients already expect.
        AppointmentError::Conflict => AppError::BadRequest(e.to_string()),
        AppointmentError::InvalidTransition { .. } => AppError::BadRequest(e.to_string()),
        AppointmentError::Unauthorized => AppError::Forbidden(
            "You are not authorized to access this appointment".to_string(),
        ),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn listing_response(appointments: Vec<Appointment>, total: usize,
                    pagination: &PaginationQuery) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": appointments.len(),
        "total": total,
        "page": pagination.page(),
        "total_pages": pagination.total_pages(total),
        "appointments": appointments,
    }))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .create_appointment(&user.id, &request, auth.token())
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let (appointments, total) = service
        .list_user_appointments(&user.id, &query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    Ok(listing_response(appointments, total, &pagination))
}

#[axum::debug_handler]
pub async fn get_all_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.role.can_view_all_appointments() {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    let service = BookingService::new(&state);

    let (appointments, total) = service
        .list_all_appointments(&user, &query, auth.token())
        .await
        .map_err(map_error)?;

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    Ok(listing_response(appointments, total, &pagination))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let (doctor_id, date) = match (query.doctor_id, query.date) {
        (Some(doctor_id), Some(date)) => (doctor_id, date),
        _ => {
            return Err(AppError::BadRequest(
                "Doctor ID and date are required parameters".to_string(),
            ));
        }
    };

    let service = SlotService::new(&state);

    let slots = service
        .available_slots(doctor_id, date, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "count": slots.len(),
        "date": date.format("%Y-%m-%d").to_string(),
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            AppointmentError::Unauthorized => AppError::Forbidden(
                "You are not authorized to view this appointment".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .update_appointment(appointment_id, &request, &user, auth.token())
        .await
        .map_err(|e| match e {
            AppointmentError::Unauthorized => AppError::Forbidden(
                "You are not authorized to update this appointment".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = BookingService::new(&state);

    service
        .delete_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(|e| match e {
            AppointmentError::Unauthorized => AppError::Forbidden(
                "You are not authorized to delete this appointment".to_string(),
            ),
            other => map_error(other),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
