use crate::domain::rbac::RoleName;

#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    /// Substring match on username or email
    pub search: Option<String>,
    pub user_type: Option<RoleName>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// `username`, `email`, `user_type`; anything else sorts newest first
    pub sort_by: Option<String>,
}
