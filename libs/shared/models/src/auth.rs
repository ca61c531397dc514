use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Role carried in the token. Unknown or missing role strings fall back
/// to `User`, never to a privileged role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Doctor,
    Admin,
}

impl UserRole {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("admin") => UserRole::Admin,
            Some("doctor") => UserRole::Doctor,
            _ => UserRole::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Doctor => "doctor",
            UserRole::Admin => "admin",
        }
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_review_predictions(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Doctor)
    }

    pub fn can_view_all_appointments(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Doctor)
    }

    pub fn can_broadcast_notifications(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authenticated principal built from a validated token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_doctor(&self) -> bool {
        self.role == UserRole::Doctor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_strings_fall_back_to_user() {
        assert_eq!(UserRole::parse(Some("superuser")), UserRole::User);
        assert_eq!(UserRole::parse(None), UserRole::User);
        assert_eq!(UserRole::parse(Some("admin")), UserRole::Admin);
        assert_eq!(UserRole::parse(Some("doctor")), UserRole::Doctor);
    }

    #[test]
    fn capability_checks_follow_role() {
        assert!(UserRole::Admin.can_manage_users());
        assert!(!UserRole::Doctor.can_manage_users());
        assert!(UserRole::Doctor.can_review_predictions());
        assert!(!UserRole::User.can_review_predictions());
        assert!(UserRole::Admin.can_broadcast_notifications());
        assert!(!UserRole::Doctor.can_broadcast_notifications());
    }
}
