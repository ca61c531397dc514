use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::create_appointment_router;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn create_test_app(config: AppConfig) -> Router {
    create_appointment_router(Arc::new(config))
}

async fn read_body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn mock_doctor_lookup(doctor_id: &Uuid) -> Mock {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .and(query_param("role", "eq.doctor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": doctor_id }
        ])))
}

#[tokio::test]
async fn test_create_appointment_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    mock_doctor_lookup(&doctor_id).mount(&mock_server).await;

    // No existing bookings, so the conflict check passes.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &user.id,
                &doctor_id.to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    // One confirmation for the patient, one for the doctor.
    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .and(body_partial_json(json!({
            "notification_type": "appointment_confirmation"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_row(&Uuid::new_v4().to_string(), &user.id, false)
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "date": "2025-03-10",
                "startTime": "09:00",
                "endTime": "09:30",
                "doctorId": doctor_id,
                "reason": "Routine checkup"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["appointment"]["status"], json!("scheduled"));
    assert_eq!(body["appointment"]["start_time"], json!("09:00"));
    assert_eq!(body["appointment"]["reason"], json!("Routine checkup"));
}

#[tokio::test]
async fn test_create_appointment_requires_date_time_reason() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "date": "2025-03-10", "startTime": "09:00" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_body_json(response).await;
    assert_eq!(body["error"], json!("Date, time, and reason are required fields"));
}

#[tokio::test]
async fn test_create_appointment_conflicting_slot_rejected() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    mock_doctor_lookup(&doctor_id).mount(&mock_server).await;

    // Existing 09:00-09:30 overlaps the requested 09:15-09:45.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "date": "2025-03-10",
                "startTime": "09:15",
                "endTime": "09:45",
                "doctorId": doctor_id,
                "reason": "Follow-up"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_body_json(response).await;
    assert_eq!(
        body["error"],
        json!("The doctor is not available at the selected time. Please choose another time.")
    );
}

#[tokio::test]
async fn test_create_appointment_back_to_back_is_allowed() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    mock_doctor_lookup(&doctor_id).mount(&mock_server).await;

    // Existing 09:00-09:30; requesting 09:30-10:00 touches only the
    // shared boundary and must not count as a clash.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &user.id,
                &doctor_id.to_string(),
                "2025-03-10",
                "09:30",
                "10:00",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_row(&Uuid::new_v4().to_string(), &user.id, false)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "date": "2025-03-10",
                "startTime": "09:30",
                "endTime": "10:00",
                "doctorId": doctor_id,
                "reason": "Routine checkup"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_appointment_unknown_doctor() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "date": "2025-03-10",
                "startTime": "09:00",
                "endTime": "09:30",
                "doctorId": doctor_id,
                "reason": "Routine checkup"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = read_body_json(response).await;
    assert_eq!(body["error"], json!("No doctor found with that ID"));
}

#[tokio::test]
async fn test_available_slots_empty_day_returns_sixteen() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    mock_doctor_lookup(&doctor_id).mount(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/available-slots?doctorId={}&date=2025-03-10",
            doctor_id
        ))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_body_json(response).await;
    let slots = body["slots"].as_array().unwrap();

    assert_eq!(body["count"], json!(16));
    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0], json!({ "start": "09:00", "end": "09:30" }));
    assert_eq!(slots[15], json!({ "start": "16:30", "end": "17:00" }));
}

#[tokio::test]
async fn test_available_slots_skips_booked_interval() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    mock_doctor_lookup(&doctor_id).mount(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "confirmed"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/available-slots?doctorId={}&date=2025-03-10",
            doctor_id
        ))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_body_json(response).await;
    let slots = body["slots"].as_array().unwrap();

    assert_eq!(slots.len(), 15);
    assert_eq!(slots[0], json!({ "start": "09:30", "end": "10:00" }));
}

#[tokio::test]
async fn test_available_slots_requires_doctor_and_date() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let request = Request::builder()
        .method("GET")
        .uri("/available-slots?date=2025-03-10")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_body_json(response).await;
    assert_eq!(body["error"], json!("Doctor ID and date are required parameters"));
}

#[tokio::test]
async fn test_update_rejects_invalid_status_transition() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    // A scheduled appointment may not jump straight to completed.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &user.id,
                &Uuid::new_v4().to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "completed" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_body_json(response).await;
    assert_eq!(
        body["error"],
        json!("Cannot change appointment status from scheduled to completed")
    );
}

#[tokio::test]
async fn test_cancellation_fires_one_notification_pair() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &user.id,
                &doctor_id.to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    // The write must stamp who cancelled and when.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "status": "cancelled",
            "cancelled_by": user.id
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &user.id,
                &doctor_id.to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "cancelled"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .and(body_partial_json(json!({
            "notification_type": "appointment_cancellation"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_row(&Uuid::new_v4().to_string(), &user.id, false)
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "status": "cancelled", "cancelReason": "Travel" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_body_json(response).await;
    assert_eq!(body["appointment"]["status"], json!("cancelled"));
}

#[tokio::test]
async fn test_repeated_cancellation_fires_nothing() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    let cancelled_row = MockSupabaseResponses::appointment_row(
        &appointment_id.to_string(),
        &user.id,
        &doctor_id.to_string(),
        "2025-03-10",
        "09:00",
        "09:30",
        "cancelled",
    );

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelled_row.clone()])))
        .mount(&mock_server)
        .await;

    // Re-asserting cancelled is an accepted no-op write.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelled_row])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "cancelled" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reschedule_excludes_itself_from_conflict_check() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let doctor_id = Uuid::new_v4();
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &user.id,
                &doctor_id.to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    // The conflict fetch must carry id=neq.<self> so the appointment
    // does not collide with its own old slot.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("id", format!("neq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &user.id,
                &doctor_id.to_string(),
                "2025-03-10",
                "10:00",
                "10:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "startTime": "10:00", "endTime": "10:30" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_body_json(response).await;
    assert_eq!(body["appointment"]["start_time"], json!("10:00"));
}

#[tokio::test]
async fn test_get_appointment_forbidden_for_stranger() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = read_body_json(response).await;
    assert_eq!(
        body["error"],
        json!("You are not authorized to view this appointment")
    );
}

#[tokio::test]
async fn test_assigned_doctor_can_view_appointment() {
    let mock_server = MockServer::start().await;

    let doctor = TestUser::doctor("doctor@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&doctor, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &Uuid::new_v4().to_string(),
                &doctor.id,
                "2025-03-10",
                "09:00",
                "09:30",
                "confirmed"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_appointment_as_admin() {
    let mock_server = MockServer::start().await;

    let admin = TestUser::admin("admin@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&admin, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_my_appointments_applies_filters() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .and(query_param("status", "eq.scheduled"))
        .and(query_param("date", "gte.2025-03-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &user.id,
                &Uuid::new_v4().to_string(),
                "2025-03-10",
                "09:00",
                "09:30",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/my-appointments?status=scheduled&startDate=2025-03-01")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_body_json(response).await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["page"], json!(1));
}

#[tokio::test]
async fn test_all_appointments_requires_staff_role() {
    let mock_server = MockServer::start().await;

    let user = TestUser::user("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_all_appointments_pins_doctor_to_own_calendar() {
    let mock_server = MockServer::start().await;

    let doctor = TestUser::doctor("doctor@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config.clone()).await;
    let token = JwtTestUtils::create_test_token(&doctor, &config.supabase_jwt_secret, Some(24));

    // Even if the query names some other doctor, the listing stays
    // scoped to the caller's own calendar.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor.id,
                "2025-03-10",
                "09:00",
                "09:30",
                "confirmed"
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/?doctor={}", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_body_json(response).await;
    assert_eq!(body["count"], json!(1));
}

#[tokio::test]
async fn test_appointments_require_authentication() {
    let mock_server = MockServer::start().await;

    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.supabase_url = mock_server.uri();

    let app = create_test_app(config).await;

    let request = Request::builder()
        .method("GET")
        .uri("/my-appointments")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
