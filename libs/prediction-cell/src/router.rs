use std::sync::Arc;
use axum::{middleware, routing::{delete, get, patch, post}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_prediction_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_prediction))
        .route("/", get(get_all_predictions))
        .route("/my-predictions", get(get_my_predictions))
        .route("/stats", get(get_prediction_stats))
        .route("/{id}", get(get_prediction))
        .route("/{id}", patch(review_prediction))
        .route("/{id}", delete(delete_prediction))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
