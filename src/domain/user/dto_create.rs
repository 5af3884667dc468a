use crate::domain::rbac::RoleName;

/// Row to insert. The password is already hashed by the caller.
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
    pub user_type: RoleName,
    pub email_verified: bool,
}
