use async_trait::async_trait;

use super::{
    NewPermission, NewRole, Permission, Role, RoleAssignment, RoleName, UpdatePermission,
    UpdateRole, VerificationOutcome,
};
use crate::domain::user::{CreateUserDto, User};
use crate::domain::DomainResult;

#[async_trait]
pub trait RoleRepositoryInterface: Send + Sync {
    async fn list_roles(&self) -> DomainResult<Vec<Role>>;
    async fn get_role_by_id(&self, id: &str) -> DomainResult<Option<Role>>;
    async fn get_role_by_name(&self, name: &str) -> DomainResult<Option<Role>>;
    async fn create_role(&self, role: NewRole) -> DomainResult<Role>;
    async fn update_role(&self, id: &str, changes: UpdateRole) -> DomainResult<Option<Role>>;
    /// Fails with `Conflict` while users still hold the role.
    async fn delete_role(&self, id: &str) -> DomainResult<()>;

    async fn list_role_permissions(&self, role_id: &str) -> DomainResult<Vec<Permission>>;
    /// `false` when the grant already existed.
    async fn grant_permission(&self, role_id: &str, permission_id: &str) -> DomainResult<bool>;
    /// `false` when there was nothing to revoke.
    async fn revoke_permission(&self, role_id: &str, permission_id: &str) -> DomainResult<bool>;
}

#[async_trait]
pub trait PermissionRepositoryInterface: Send + Sync {
    async fn list_permissions(&self) -> DomainResult<Vec<Permission>>;
    async fn get_permission_by_id(&self, id: &str) -> DomainResult<Option<Permission>>;
    async fn get_permission_by_name(&self, name: &str) -> DomainResult<Option<Permission>>;
    async fn create_permission(&self, permission: NewPermission) -> DomainResult<Permission>;
    async fn update_permission(
        &self,
        id: &str,
        changes: UpdatePermission,
    ) -> DomainResult<Option<Permission>>;
    /// Also removes every grant of the permission.
    async fn delete_permission(&self, id: &str) -> DomainResult<()>;
}

/// User to role association and everything that must change it atomically.
#[async_trait]
pub trait AccessRepositoryInterface: Send + Sync {
    /// Names reachable through user_roles -> role_permissions -> permissions.
    /// Empty when the user holds no role.
    async fn permissions_for_user(&self, user_id: &str) -> DomainResult<Vec<String>>;

    async fn assignment_for_user(&self, user_id: &str) -> DomainResult<Option<RoleAssignment>>;

    /// Any account currently holding `role` through the association table.
    async fn find_user_with_role(&self, role: RoleName) -> DomainResult<Option<String>>;

    /// Flip `email_verified`, clear the stored verification token and create
    /// the default assignment if none exists, in one transaction.
    async fn complete_verification(
        &self,
        user_id: &str,
        role: RoleName,
        assigned_by: Option<&str>,
    ) -> DomainResult<VerificationOutcome>;

    /// Move `users.user_type` and the `user_roles` row together.
    /// `NotFound` when the user has no assignment yet.
    async fn change_user_role(
        &self,
        user_id: &str,
        role: RoleName,
        assigned_by: &str,
    ) -> DomainResult<()>;

    /// Insert a verified account with a self-assigned role row.
    async fn create_self_assigned_user(&self, dto: CreateUserDto) -> DomainResult<User>;
}
