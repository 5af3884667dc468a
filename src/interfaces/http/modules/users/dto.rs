//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::User;

/// User API representation. Credentials and one-time tokens never leave
/// the service.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub user_type: String,
    pub email_verified: bool,
    pub active: bool,
    pub deletion_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            user_type: u.user_type.to_string(),
            email_verified: u.email_verified,
            active: u.active,
            deletion_requested: u.deletion_requested,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Substring of username or email
    pub search: Option<String>,
    /// Filter by role name
    pub user_type: Option<String>,
    #[param(default = 1)]
    pub page: Option<u32>,
    #[param(default = 20)]
    pub page_size: Option<u32>,
    /// `username`, `email` or `user_type`; newest first otherwise
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

/// Body of `POST /users/{id}/demote`. An empty body demotes to `user`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DemoteRequest {
    pub role_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeRoleRequest {
    #[validate(length(min = 1, message = "role_name is required"))]
    pub role_name: String,
}
