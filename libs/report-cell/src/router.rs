use std::sync::Arc;
use axum::{middleware, routing::{delete, get, patch, post}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_report_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(save_report))
        .route("/my-reports", get(get_my_reports))
        .route("/recent", get(get_recent_reports))
        .route("/public", get(get_public_reports))
        .route("/{id}", get(get_report))
        .route("/{id}", patch(update_report))
        .route("/{id}", delete(delete_report))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
