use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::get,
};
use chrono::Utc;
use serde_json::{json, Value};

use appointment_cell::router::create_appointment_router;
use notification_cell::router::create_notification_router;
use prediction_cell::router::create_prediction_router;
use report_cell::router::create_report_router;
use shared_config::AppConfig;
use user_cell::router::create_user_router;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // `/` and `/health` are the only unauthenticated routes.
    let service_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state.clone());

    Router::new()
        .merge(service_routes)
        .nest("/api/users", create_user_router(state.clone()))
        .nest("/api/predictions", create_prediction_router(state.clone()))
        .nest("/api/appointments", create_appointment_router(state.clone()))
        .nest("/api/notifications", create_notification_router(state.clone()))
        .nest("/api/reports", create_report_router(state))
}

async fn root(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Diabetes Prediction API is running!",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": config.environment,
    }))
}

async fn health(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Server is running",
        "environment": config.environment,
        "timestamp": Utc::now().to_rfc3339(),
        "database": if config.is_configured() { "configured" } else { "not configured" },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use shared_utils::test_utils::TestConfig;

    fn test_router() -> Router {
        let config = TestConfig::default().to_app_config();
        create_router(Arc::new(config))
    }

    #[tokio::test]
    async fn root_route_reports_service_banner() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], json!("Diabetes Prediction API is running!"));
    }

    #[tokio::test]
    async fn health_route_reports_datastore_configuration() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["database"], json!("configured"));
    }

    #[tokio::test]
    async fn nested_cell_routes_require_authentication() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/users/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
