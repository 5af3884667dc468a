use std::sync::Arc;

use tracing::info;

use crate::domain::rbac::permission::{USER_READ_ALL, USER_UPDATE_ALL};
use crate::domain::{
    AccessRepositoryInterface, DomainError, DomainResult, GetUserDto, PermissionSet, RoleName,
    UpdateUserDto, User, UserRepositoryInterface,
};
use crate::shared::{trimmed, validate_username, PaginatedResult};

/// Account operations performed by a signed-in caller.
///
/// Route guards establish the baseline permission; this service adds the
/// checks that depend on which account is being touched.
pub struct UserService {
    users: Arc<dyn UserRepositoryInterface>,
    access: Arc<dyn AccessRepositoryInterface>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepositoryInterface>,
        access: Arc<dyn AccessRepositoryInterface>,
    ) -> Self {
        Self { users, access }
    }

    async fn find(&self, id: &str) -> DomainResult<User> {
        self.users
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }

    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.users.list_users(dto).await
    }

    pub async fn get_user(
        &self,
        actor_id: &str,
        target_id: &str,
        granted: &PermissionSet,
    ) -> DomainResult<User> {
        if actor_id != target_id && !granted.contains(USER_READ_ALL) {
            return Err(DomainError::Forbidden(
                "Not allowed to view other accounts".into(),
            ));
        }
        self.find(target_id).await
    }

    pub async fn update_user(
        &self,
        actor_id: &str,
        target_id: &str,
        granted: &PermissionSet,
        dto: UpdateUserDto,
    ) -> DomainResult<User> {
        if actor_id != target_id && !granted.contains(USER_UPDATE_ALL) {
            return Err(DomainError::Forbidden(
                "Not allowed to update other accounts".into(),
            ));
        }

        let dto = UpdateUserDto {
            username: dto.username.as_deref().map(validate_username).transpose()?,
            first_name: trimmed(dto.first_name),
            last_name: trimmed(dto.last_name),
        };
        if dto.is_empty() {
            return Err(DomainError::Validation("No fields to update".into()));
        }

        if let Some(ref username) = dto.username {
            if let Some(holder) = self.users.get_user_by_username(username).await? {
                if holder.id != target_id {
                    return Err(DomainError::Conflict("Username already exists".into()));
                }
            }
        }

        let user = self
            .users
            .update_user(target_id, dto)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", target_id))?;

        info!(user_id = %user.id, actor_id, "User profile updated");
        Ok(user)
    }

    /// First half of deletion: the owner marks the account.
    pub async fn request_deletion(&self, actor_id: &str, target_id: &str) -> DomainResult<User> {
        if actor_id != target_id {
            return Err(DomainError::Forbidden(
                "Deletion can only be requested for your own account".into(),
            ));
        }
        self.find(target_id).await?;
        self.users.set_deletion_requested(target_id, true).await?;

        info!(user_id = target_id, "Account deletion requested");
        self.find(target_id).await
    }

    /// Second half: a privileged actor removes a marked account.
    pub async fn delete_user(&self, actor_id: &str, target_id: &str) -> DomainResult<()> {
        if actor_id == target_id {
            return Err(DomainError::Forbidden(
                "Cannot delete your own account through this operation".into(),
            ));
        }

        let target = self.find(target_id).await?;

        let assigned_admin = self
            .access
            .assignment_for_user(target_id)
            .await?
            .is_some_and(|a| a.role_name == RoleName::SystemAdmin.as_str());
        if target.is_system_admin() || assigned_admin {
            return Err(DomainError::Forbidden(
                "System administrator accounts cannot be deleted".into(),
            ));
        }

        if !target.deletion_requested {
            return Err(DomainError::Validation(
                "User has not requested account deletion".into(),
            ));
        }

        self.users.delete_user(target_id).await?;
        info!(user_id = target_id, actor_id, "User deleted");
        metrics::counter!("rbac_users_deleted_total").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{fixture, Fixture};
    use crate::domain::CreateUserDto;

    async fn create(f: &Fixture, username: &str, role: RoleName) -> User {
        let dto = CreateUserDto {
            username: username.into(),
            email: format!("{}@example.com", username),
            first_name: None,
            last_name: None,
            password_hash: "hash".into(),
            user_type: role,
            email_verified: true,
        };
        if role == RoleName::SystemAdmin {
            f.access.create_self_assigned_user(dto).await.unwrap()
        } else {
            let user = f.users.create_user(dto).await.unwrap();
            f.access
                .complete_verification(&user.id, role, None)
                .await
                .unwrap();
            user
        }
    }

    fn perms(names: &[&str]) -> PermissionSet {
        names.iter().copied().collect()
    }

    #[tokio::test]
    async fn reading_others_needs_read_all() {
        let f = fixture().await;
        let svc = UserService::new(f.users.clone(), f.access.clone());
        let a = create(&f, "alice", RoleName::User).await;
        let b = create(&f, "bob", RoleName::User).await;

        let own = svc.get_user(&a.id, &a.id, &perms(&[])).await.unwrap();
        assert_eq!(own.username, "alice");

        let err = svc
            .get_user(&a.id, &b.id, &perms(&["user:read:self"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        svc.get_user(&a.id, &b.id, &perms(&["user:read:all"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_trims_and_checks_username() {
        let f = fixture().await;
        let svc = UserService::new(f.users.clone(), f.access.clone());
        let a = create(&f, "alice", RoleName::User).await;
        create(&f, "bob", RoleName::User).await;

        let updated = svc
            .update_user(
                &a.id,
                &a.id,
                &perms(&[]),
                UpdateUserDto {
                    first_name: Some("  Alice ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Alice"));

        let taken = svc
            .update_user(
                &a.id,
                &a.id,
                &perms(&[]),
                UpdateUserDto {
                    username: Some("bob".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(taken, DomainError::Conflict(_)));

        let empty = svc
            .update_user(&a.id, &a.id, &perms(&[]), UpdateUserDto::default())
            .await
            .unwrap_err();
        assert!(matches!(empty, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn deletion_needs_request_and_protects_admins() {
        let f = fixture().await;
        let svc = UserService::new(f.users.clone(), f.access.clone());
        let root = create(&f, "root", RoleName::SystemAdmin).await;
        let admin = create(&f, "admin", RoleName::Admin).await;
        let alice = create(&f, "alice", RoleName::User).await;

        let not_requested = svc.delete_user(&admin.id, &alice.id).await.unwrap_err();
        assert!(matches!(not_requested, DomainError::Validation(_)));

        let foreign = svc.request_deletion(&admin.id, &alice.id).await.unwrap_err();
        assert!(matches!(foreign, DomainError::Forbidden(_)));

        let marked = svc.request_deletion(&alice.id, &alice.id).await.unwrap();
        assert!(marked.deletion_requested);

        let own = svc.delete_user(&alice.id, &alice.id).await.unwrap_err();
        assert!(matches!(own, DomainError::Forbidden(_)));

        svc.delete_user(&admin.id, &alice.id).await.unwrap();
        assert!(f.users.get_user_by_id(&alice.id).await.unwrap().is_none());

        f.users.set_deletion_requested(&root.id, true).await.unwrap();
        let protected = svc.delete_user(&admin.id, &root.id).await.unwrap_err();
        assert!(matches!(protected, DomainError::Forbidden(_)));

        let missing = svc.delete_user(&admin.id, "missing").await.unwrap_err();
        assert!(matches!(missing, DomainError::NotFound { .. }));
    }
}
