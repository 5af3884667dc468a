use chrono::{DateTime, Utc};

use super::RoleName;

#[derive(Debug, Clone)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// The hierarchy tier this role represents, if it is a built-in one.
    pub fn builtin(&self) -> Option<RoleName> {
        self.name.parse().ok()
    }
}

#[derive(Debug, Clone)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `user_roles` row of a verified user.
#[derive(Debug, Clone)]
pub struct RoleAssignment {
    pub user_id: String,
    pub role_id: String,
    pub role_name: String,
    pub assigned_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPermission {
    pub name: String,
    pub description: String,
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Flag flipped and default role assigned in this call.
    Verified,
    /// Nothing changed.
    AlreadyVerified,
}
