use std::sync::Arc;
use axum::{middleware, routing::{delete, get, patch}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_user_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/me", get(get_me))
        .route("/doctors", get(get_doctors))
        .route("/dashboard-stats", get(get_dashboard_stats))
        .route("/", get(get_all_users))
        .route("/{id}", get(get_user))
        .route("/{id}", patch(update_user))
        .route("/{id}", delete(delete_user))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
