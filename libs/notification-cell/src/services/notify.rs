// libs/notification-cell/src/services/notify.rs
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};
use shared_models::pagination::PaginationQuery;

use crate::models::{
    BroadcastRecipients, BroadcastRequest, Notification, NotificationError,
    NotificationListQuery, NotificationOptions, NotificationPriority, NotificationType,
};

#[derive(Debug, Deserialize)]
struct RecipientRow {
    id: Uuid,
}

pub struct NotificationListing {
    pub notifications: Vec<Notification>,
    pub total: usize,
    pub unread_count: usize,
}

/// Producer and query surface for notification rows. Event sources
/// (appointment lifecycle, prediction completion, admin broadcast) call
/// `create_notification`; recipients read and mutate through the rest.
pub struct NotificationService {
    supabase: SupabaseClient,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_notification(
        &self,
        recipient: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        options: NotificationOptions,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let body = json!({
            "id": Uuid::new_v4(),
            "user_id": recipient,
            "sender_id": options.sender_id,
            "notification_type": notification_type,
            "title": title,
            "message": message,
            "read": false,
            "read_at": null,
            "priority": options.priority,
            "link": options.link,
            "related_model": options.related_model,
            "related_id": options.related_id,
            "expires_at": options.expires_at.map(|t| t.to_rfc3339()),
            "created_at": Utc::now().to_rfc3339(),
        });

        let created: Vec<Notification> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/notifications",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        created.into_iter().next().ok_or_else(|| {
            NotificationError::DatabaseError("notification row not returned".to_string())
        })
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        query: &NotificationListQuery,
        auth_token: &str,
    ) -> Result<NotificationListing, NotificationError> {
        let pagination = PaginationQuery { page: query.page, limit: query.limit };
        let filter = Self::list_filter(user_id, query);

        let path = format!(
            "/rest/v1/notifications?{}&order=created_at.desc&limit={}&offset={}",
            filter,
            pagination.limit(),
            pagination.offset(),
        );

        let notifications: Vec<Notification> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let total = self.supabase
            .count_rows("notifications", Some(&filter), Some(auth_token))
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let unread_count = self.unread_count(user_id, auth_token).await?;

        Ok(NotificationListing { notifications, total, unread_count })
    }

    pub async fn unread_count(&self, user_id: &str, auth_token: &str)
        -> Result<usize, NotificationError> {
        let filter = format!("user_id=eq.{}&read=eq.false", user_id);
        self.supabase
            .count_rows("notifications", Some(&filter), Some(auth_token))
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }

    pub async fn mark_as_read(
        &self,
        notification_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Notification, NotificationError> {
        let existing = self.get_notification(notification_id, auth_token).await?;
        if existing.user_id.to_string() != user_id {
            return Err(NotificationError::Unauthorized);
        }

        let path = format!("/rest/v1/notifications?id=eq.{}", notification_id);
        let body = json!({
            "read": true,
            "read_at": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Notification> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        updated.into_iter().next().ok_or(NotificationError::NotFound)
    }

    pub async fn mark_all_as_read(&self, user_id: &str, auth_token: &str)
        -> Result<usize, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&read=eq.false",
            user_id
        );
        let body = json!({
            "read": true,
            "read_at": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Notification> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(updated.len())
    }

    pub async fn delete_notification(
        &self,
        notification_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<(), NotificationError> {
        let existing = self.get_notification(notification_id, auth_token).await?;
        if existing.user_id.to_string() != user_id {
            return Err(NotificationError::Unauthorized);
        }

        let path = format!("/rest/v1/notifications?id=eq.{}", notification_id);
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub async fn delete_read(&self, user_id: &str, auth_token: &str)
        -> Result<usize, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&read=eq.true",
            user_id
        );

        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(deleted.len())
    }

    /// Drops rows whose expiry has passed. The datastore has no TTL
    /// index, so this runs as an explicit admin maintenance call.
    pub async fn purge_expired(&self, auth_token: &str) -> Result<usize, NotificationError> {
        let now = Utc::now().to_rfc3339();
        let path = format!(
            "/rest/v1/notifications?expires_at=lt.{}",
            urlencoding::encode(&now)
        );

        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(deleted.len())
    }

    /// Creates one system alert per resolved recipient. Per-recipient
    /// failures are logged and skipped so one bad row cannot stall the
    /// rest of the fan-out.
    pub async fn broadcast(
        &self,
        request: &BroadcastRequest,
        sender_id: &str,
        auth_token: &str,
    ) -> Result<usize, NotificationError> {
        if request.title.trim().is_empty() || request.message.trim().is_empty() {
            return Err(NotificationError::ValidationError(
                "Recipients, title, and message are required".to_string(),
            ));
        }

        let recipients = self.resolve_recipients(&request.recipients, auth_token).await?;
        debug!("Broadcasting notification to {} recipients", recipients.len());

        let sender = Uuid::parse_str(sender_id).ok();
        let mut created = 0;
        for recipient in recipients {
            let options = NotificationOptions {
                sender_id: sender,
                priority: request.priority.unwrap_or(NotificationPriority::Normal),
                link: request.link.clone(),
                ..Default::default()
            };

            match self.create_notification(
                recipient,
                NotificationType::SystemAlert,
                &request.title,
                &request.message,
                options,
                auth_token,
            ).await {
                Ok(_) => created += 1,
                Err(e) => warn!("Broadcast delivery to {} failed: {}", recipient, e),
            }
        }

        Ok(created)
    }

    async fn resolve_recipients(
        &self,
        recipients: &BroadcastRecipients,
        auth_token: &str,
    ) -> Result<Vec<Uuid>, NotificationError> {
        let path = match recipients {
            BroadcastRecipients::Keyword(keyword) if keyword == "all" => {
                "/rest/v1/users?select=id".to_string()
            }
            BroadcastRecipients::Keyword(keyword)
                if matches!(keyword.as_str(), "user" | "doctor" | "admin") => {
                format!("/rest/v1/users?select=id&role=eq.{}", keyword)
            }
            BroadcastRecipients::Keyword(_) => {
                return Err(NotificationError::ValidationError(
                    "Invalid recipients format".to_string(),
                ));
            }
            BroadcastRecipients::Ids(ids) => {
                if ids.is_empty() {
                    return Err(NotificationError::ValidationError(
                        "Invalid recipients format".to_string(),
                    ));
                }
                let list = ids.iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                format!(
                    "/rest/v1/users?select=id&id=in.{}",
                    urlencoding::encode(&format!("({})", list))
                )
            }
        };

        let rows: Vec<RecipientRow> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn get_notification(&self, notification_id: Uuid, auth_token: &str)
        -> Result<Notification, NotificationError> {
        let path = format!("/rest/v1/notifications?id=eq.{}", notification_id);

        let rows: Vec<Notification> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(NotificationError::NotFound)
    }

    fn list_filter(user_id: &str, query: &NotificationListQuery) -> String {
        let mut parts = vec![format!("user_id=eq.{}", user_id)];

        if let Some(read) = query.read {
            parts.push(format!("read=eq.{}", read));
        }
        if let Some(notification_type) = query.notification_type {
            parts.push(format!("notification_type=eq.{}", notification_type));
        }
        if let Some(priority) = query.priority {
            let tag = match priority {
                NotificationPriority::Low => "low",
                NotificationPriority::Normal => "normal",
                NotificationPriority::High => "high",
            };
            parts.push(format!("priority=eq.{}", tag));
        }

        // Expired rows stay out of every listing.
        let now = Utc::now().to_rfc3339();
        parts.push(format!(
            "or={}",
            urlencoding::encode(&format!("(expires_at.is.null,expires_at.gt.{})", now))
        ));

        parts.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_filter_includes_only_requested_parts() {
        let query = NotificationListQuery {
            page: None,
            limit: None,
            read: Some(false),
            notification_type: Some(NotificationType::PredictionResult),
            priority: None,
        };

        let filter = NotificationService::list_filter("user-1", &query);
        assert!(filter.starts_with("user_id=eq.user-1"));
        assert!(filter.contains("read=eq.false"));
        assert!(filter.contains("notification_type=eq.prediction_result"));
        assert!(!filter.contains("priority=eq."));
        assert!(filter.contains("expires_at.is.null"));
    }
}
