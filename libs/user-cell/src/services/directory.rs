// libs/user-cell/src/services/directory.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};
use shared_models::pagination::PaginationQuery;

use crate::models::{DoctorSummary, UpdateUserRequest, UserError, UserListQuery, UserProfile};

/// User directory: profile reads, the doctor picker listing and admin
/// user management. Password changes belong to the identity provider
/// and are rejected here outright.
pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_profile(&self, user_id: &str, auth_token: &str)
        -> Result<UserProfile, UserError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);

        let rows: Vec<UserProfile> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(UserError::NotFound)
    }

    /// Active doctors only; deactivated accounts disappear from the
    /// booking picker without being deleted.
    pub async fn list_doctors(&self, auth_token: &str) -> Result<Vec<DoctorSummary>, UserError> {
        let path = "/rest/v1/users?select=id,name,specialization\
                    &role=eq.doctor&active=eq.true&order=name.asc";

        self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))
    }

    pub async fn list_users(
        &self,
        query: &UserListQuery,
        auth_token: &str,
    ) -> Result<(Vec<UserProfile>, usize), UserError> {
        let pagination = PaginationQuery { page: query.page, limit: query.limit };

        let filter = query.role.map(|role| format!("role=eq.{}", role));

        let mut path = format!(
            "/rest/v1/users?order=created_at.desc&limit={}&offset={}",
            pagination.limit(),
            pagination.offset(),
        );
        if let Some(filter) = &filter {
            path.push('&');
            path.push_str(filter);
        }

        let users: Vec<UserProfile> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        let total = self.supabase
            .count_rows("users", filter.as_deref(), Some(auth_token))
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        Ok((users, total))
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: &UpdateUserRequest,
        auth_token: &str,
    ) -> Result<UserProfile, UserError> {
        if request.touches_password() {
            return Err(UserError::PasswordUpdateRejected);
        }

        let mut fields = serde_json::Map::new();
        if let Some(name) = &request.name {
            fields.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(email) = &request.email {
            fields.insert("email".to_string(), json!(email.trim().to_lowercase()));
        }
        if let Some(role) = request.role {
            fields.insert("role".to_string(), json!(role));
        }
        if let Some(active) = request.active {
            fields.insert("active".to_string(), json!(active));
        }
        if let Some(specialization) = &request.specialization {
            fields.insert("specialization".to_string(), json!(specialization));
        }

        // An update that names no editable field reads back the row.
        if fields.is_empty() {
            return self.get_profile(&user_id.to_string(), auth_token).await;
        }

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let updated: Vec<UserProfile> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(fields)),
            Some(return_representation()),
        ).await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        let profile = updated.into_iter().next().ok_or(UserError::NotFound)?;
        debug!("Updated user {}", profile.id);
        Ok(profile)
    }

    pub async fn delete_user(&self, user_id: Uuid, auth_token: &str) -> Result<(), UserError> {
        // Read first so a missing id surfaces as 404, not a silent no-op.
        self.get_profile(&user_id.to_string(), auth_token).await?;

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        debug!("Deleted user {}", user_id);
        Ok(())
    }
}
