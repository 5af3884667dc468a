//! Authentication DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::User;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 20, message = "password must be 8-20 characters"))]
    pub password: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the session expires
    pub expires_in: i64,
    pub user: LoginUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginUser {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: String,
}

impl From<&User> for LoginUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
            user_type: u.user_type.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmailRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
}

/// Either `token` (from the link) or `email` + `code` (from the mail body).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirmRequest {
    pub token: Option<String>,
    pub email: Option<String>,
    pub code: Option<String>,
    #[validate(length(min = 8, max = 20, message = "password must be 8-20 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ResetTokenQuery {
    /// Signed reset token, as in the emailed link
    pub token: Option<String>,
}
