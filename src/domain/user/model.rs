use chrono::{DateTime, Utc};

use crate::domain::rbac::RoleName;

/// Identity and credential record.
///
/// `user_type` mirrors the single `user_roles` row of a verified user and is
/// only changed together with it. Unverified users carry the default role
/// name but have no association row yet.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub user_type: RoleName,
    pub email_verified: bool,
    pub active: bool,
    pub deletion_requested: bool,
    pub verification_token: Option<String>,
    pub reset_token: Option<String>,
    /// The stored reset code is refused after this instant.
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_system_admin(&self) -> bool {
        self.user_type == RoleName::SystemAdmin
    }
}
