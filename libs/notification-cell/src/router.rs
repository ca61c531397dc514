use std::sync::Arc;
use axum::{middleware, routing::{delete, get, patch, post}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_notification_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(get_my_notifications))
        .route("/unread-count", get(get_unread_count))
        .route("/mark-all-read", patch(mark_all_notifications_read))
        .route("/read", delete(delete_read_notifications))
        .route("/expired", delete(purge_expired_notifications))
        .route("/broadcast", post(broadcast_notification))
        .route("/{id}/mark-read", patch(mark_notification_read))
        .route("/{id}", delete(delete_notification))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
