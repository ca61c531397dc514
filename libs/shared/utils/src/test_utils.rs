use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub ml_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            ml_api_url: "http://localhost:8000".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointed at a mock datastore, usually a wiremock server URI.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ml_api_url: self.ml_api_url.clone(),
            ml_api_timeout_secs: 2,
            port: 3000,
            environment: "test".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn user(email: &str) -> Self {
        Self::new(email, "user")
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: UserRole::parse(Some(&self.role)),
            created_at: Some(Utc::now()),
        }
    }

    /// Bearer token for this user signed with the default test secret.
    pub fn bearer(&self) -> String {
        let token = JwtTestUtils::create_test_token(
            self,
            &TestConfig::default().jwt_secret,
            Some(24),
        );
        format!("Bearer {}", token)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned datastore rows for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_row(user_id: &str, role: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "name": "Test User",
            "email": "test@example.com",
            "role": role,
            "specialization": if role == "doctor" { json!("Endocrinology") } else { json!(null) },
            "phone": null,
            "active": true,
            "verified": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_data() -> serde_json::Value {
        json!({
            "age": 45,
            "gender": "female",
            "bmi": 28.5,
            "bloodPressure": { "systolic": 120, "diastolic": 80 },
            "glucoseLevel": 110.0,
            "insulinLevel": 80.0,
            "skinThickness": 25.0,
            "pregnancies": 2,
            "diabetesPedigreeFunction": 0.52,
            "physicalActivity": "moderate",
            "smokingStatus": "never",
            "alcoholConsumption": "none",
            "familyHistory": false
        })
    }

    pub fn prediction_row(prediction_id: &str, user_id: &str, status: &str) -> serde_json::Value {
        let result = if status == "completed" {
            json!({
                "prediction": "pre-diabetic",
                "probability": 0.62,
                "riskLevel": "high",
                "riskFactors": ["Elevated glucose"],
                "recommendations": ["Schedule a follow-up"]
            })
        } else {
            json!(null)
        };

        json!({
            "id": prediction_id,
            "user_id": user_id,
            "patient_data": Self::patient_data(),
            "result": result,
            "status": status,
            "notes": null,
            "reviewed_by": null,
            "reviewed_at": null,
            "review_notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(appointment_id: &str, user_id: &str, doctor_id: &str,
                           date: &str, start: &str, end: &str, status: &str)
                           -> serde_json::Value {
        json!({
            "id": appointment_id,
            "user_id": user_id,
            "doctor_id": doctor_id,
            "date": date,
            "start_time": start,
            "end_time": end,
            "appointment_type": "consultation",
            "status": status,
            "reason": "Routine checkup",
            "notes": null,
            "location": "Main Clinic",
            "cancelled_by": null,
            "cancelled_at": null,
            "cancel_reason": null,
            "rescheduled_from": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn notification_row(notification_id: &str, user_id: &str, read: bool) -> serde_json::Value {
        json!({
            "id": notification_id,
            "user_id": user_id,
            "notification_type": "system_alert",
            "title": "Test notification",
            "message": "Something happened",
            "read": read,
            "read_at": if read { json!("2024-01-02T00:00:00Z") } else { json!(null) },
            "priority": "normal",
            "link": null,
            "related_model": null,
            "related_id": null,
            "expires_at": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn report_row(report_id: &str, user_id: &str, prediction_id: &str,
                      is_public: bool) -> serde_json::Value {
        json!({
            "id": report_id,
            "user_id": user_id,
            "prediction_id": prediction_id,
            "title": "My report",
            "description": null,
            "tags": [],
            "is_public": is_public,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
