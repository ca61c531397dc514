use std::sync::Arc;
use axum::{middleware, routing::{delete, get, patch, post}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_appointment_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_appointment))
        .route("/", get(get_all_appointments))
        .route("/my-appointments", get(get_my_appointments))
        .route("/available-slots", get(get_available_slots))
        .route("/{id}", get(get_appointment))
        .route("/{id}", patch(update_appointment))
        .route("/{id}", delete(delete_appointment))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
