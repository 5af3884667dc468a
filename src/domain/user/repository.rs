use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CreateUserDto, GetUserDto, UpdateUserDto, User};
use crate::domain::DomainResult;
use crate::shared::PaginatedResult;

#[async_trait]
pub trait UserRepositoryInterface: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User>;

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>>;
    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>>;

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>>;

    async fn set_verification_token(&self, id: &str, token: Option<&str>) -> DomainResult<()>;
    /// Replace any pending reset code.
    async fn set_reset_token(
        &self,
        id: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<()>;

    /// Store a new hash and clear any pending reset code.
    async fn update_user_password(&self, id: &str, new_password_hash: &str) -> DomainResult<()>;

    async fn set_deletion_requested(&self, id: &str, requested: bool) -> DomainResult<()>;
    async fn delete_user(&self, id: &str) -> DomainResult<()>;
}
