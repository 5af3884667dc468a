use std::sync::Arc;

use tracing::info;

use crate::application::Actor;
use crate::domain::rbac::{
    check_demotion, check_direct_change, check_promotion, NewPermission, NewRole,
    UpdatePermission, UpdateRole,
};
use crate::domain::{
    AccessRepositoryInterface, DomainError, DomainResult, Permission,
    PermissionRepositoryInterface, Role, RoleName, RoleRepositoryInterface, User,
    UserRepositoryInterface,
};
use crate::shared::trimmed;

const NAME_MAX_LEN: usize = 100;

/// Permission creation input. `resource` and `action` default to the first
/// two segments of `name`.
#[derive(Debug, Clone)]
pub struct NewPermissionInput {
    pub name: String,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

fn validate_name(kind: &str, name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation(format!("{} name is required", kind)));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::Validation(format!(
            "{} name must be at most {} characters",
            kind, NAME_MAX_LEN
        )));
    }
    Ok(name.to_string())
}

/// `resource:action[:scope]`, every segment non-empty.
fn permission_parts(name: &str) -> DomainResult<(String, String)> {
    let segments: Vec<&str> = name.split(':').collect();
    if !(2..=3).contains(&segments.len()) || segments.iter().any(|s| s.trim().is_empty()) {
        return Err(DomainError::Validation(
            "Permission name must look like resource:action[:scope]".into(),
        ));
    }
    Ok((segments[0].to_string(), segments[1].to_string()))
}

pub struct AccessAdminService {
    users: Arc<dyn UserRepositoryInterface>,
    roles: Arc<dyn RoleRepositoryInterface>,
    permissions: Arc<dyn PermissionRepositoryInterface>,
    access: Arc<dyn AccessRepositoryInterface>,
}

impl AccessAdminService {
    pub fn new(
        users: Arc<dyn UserRepositoryInterface>,
        roles: Arc<dyn RoleRepositoryInterface>,
        permissions: Arc<dyn PermissionRepositoryInterface>,
        access: Arc<dyn AccessRepositoryInterface>,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
            access,
        }
    }

    // ── Roles ───────────────────────────────────────────────────

    pub async fn list_roles(&self) -> DomainResult<Vec<Role>> {
        self.roles.list_roles().await
    }

    pub async fn get_role(&self, id: &str) -> DomainResult<Role> {
        self.roles
            .get_role_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Role", "id", id))
    }

    pub async fn create_role(&self, name: &str, description: Option<String>) -> DomainResult<Role> {
        let name = validate_name("Role", name)?;
        let role = self
            .roles
            .create_role(NewRole {
                name,
                description: trimmed(description).unwrap_or_default(),
            })
            .await?;
        info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    pub async fn update_role(&self, id: &str, changes: UpdateRole) -> DomainResult<Role> {
        let existing = self.get_role(id).await?;
        let name = changes
            .name
            .as_deref()
            .map(|n| validate_name("Role", n))
            .transpose()?;

        if existing.builtin().is_some() && name.as_deref().is_some_and(|n| n != existing.name) {
            return Err(DomainError::Forbidden("Built-in roles cannot be renamed".into()));
        }

        let changes = UpdateRole {
            name,
            description: changes.description.map(|d| d.trim().to_string()),
        };
        let role = self
            .roles
            .update_role(id, changes)
            .await?
            .ok_or_else(|| DomainError::not_found("Role", "id", id))?;
        info!(role_id = %role.id, "Role updated");
        Ok(role)
    }

    pub async fn delete_role(&self, id: &str) -> DomainResult<()> {
        let existing = self.get_role(id).await?;
        if existing.builtin().is_some() {
            return Err(DomainError::Forbidden("Built-in roles cannot be deleted".into()));
        }
        self.roles.delete_role(id).await?;
        info!(role_id = id, name = %existing.name, "Role deleted");
        Ok(())
    }

    pub async fn list_role_permissions(&self, role_id: &str) -> DomainResult<Vec<Permission>> {
        self.get_role(role_id).await?;
        self.roles.list_role_permissions(role_id).await
    }

    /// `false` when the role already had the permission.
    pub async fn grant_permission(&self, role_id: &str, permission_id: &str) -> DomainResult<bool> {
        self.get_role(role_id).await?;
        self.get_permission(permission_id).await?;
        let granted = self.roles.grant_permission(role_id, permission_id).await?;
        if granted {
            info!(role_id, permission_id, "Permission granted");
        }
        Ok(granted)
    }

    /// `false` when there was nothing to revoke.
    pub async fn revoke_permission(&self, role_id: &str, permission_id: &str) -> DomainResult<bool> {
        self.get_role(role_id).await?;
        self.get_permission(permission_id).await?;
        let revoked = self.roles.revoke_permission(role_id, permission_id).await?;
        if revoked {
            info!(role_id, permission_id, "Permission revoked");
        }
        Ok(revoked)
    }

    // ── Permissions ─────────────────────────────────────────────

    pub async fn list_permissions(&self) -> DomainResult<Vec<Permission>> {
        self.permissions.list_permissions().await
    }

    pub async fn get_permission(&self, id: &str) -> DomainResult<Permission> {
        self.permissions
            .get_permission_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Permission", "id", id))
    }

    pub async fn create_permission(&self, input: NewPermissionInput) -> DomainResult<Permission> {
        let name = validate_name("Permission", &input.name)?;
        let (resource, action) = permission_parts(&name)?;
        let permission = self
            .permissions
            .create_permission(NewPermission {
                resource: trimmed(input.resource).unwrap_or(resource),
                action: trimmed(input.action).unwrap_or(action),
                description: trimmed(input.description).unwrap_or_default(),
                name,
            })
            .await?;
        info!(permission_id = %permission.id, name = %permission.name, "Permission created");
        Ok(permission)
    }

    pub async fn update_permission(
        &self,
        id: &str,
        changes: UpdatePermission,
    ) -> DomainResult<Permission> {
        let name = match changes.name.as_deref() {
            Some(n) => {
                let n = validate_name("Permission", n)?;
                permission_parts(&n)?;
                Some(n)
            }
            None => None,
        };
        let changes = UpdatePermission {
            name,
            description: changes.description.map(|d| d.trim().to_string()),
            resource: trimmed(changes.resource),
            action: trimmed(changes.action),
        };
        let permission = self
            .permissions
            .update_permission(id, changes)
            .await?
            .ok_or_else(|| DomainError::not_found("Permission", "id", id))?;
        info!(permission_id = %permission.id, "Permission updated");
        Ok(permission)
    }

    pub async fn delete_permission(&self, id: &str) -> DomainResult<()> {
        let existing = self.get_permission(id).await?;
        self.permissions.delete_permission(id).await?;
        info!(permission_id = id, name = %existing.name, "Permission deleted");
        Ok(())
    }

    // ── Role transitions ────────────────────────────────────────

    async fn target(&self, user_id: &str) -> DomainResult<User> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))?;
        if !user.email_verified {
            return Err(DomainError::Validation(
                "User has not verified their email".into(),
            ));
        }
        Ok(user)
    }

    async fn apply(&self, actor: &Actor, target: User, role: RoleName) -> DomainResult<User> {
        self.access
            .change_user_role(&target.id, role, &actor.user_id)
            .await?;
        info!(
            user_id = %target.id,
            actor_id = %actor.user_id,
            from = %target.user_type,
            to = %role,
            "Role changed"
        );
        metrics::counter!("rbac_role_changes_total", "to" => role.as_str()).increment(1);
        self.users
            .get_user_by_id(&target.id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", target.id.as_str()))
    }

    pub async fn promote(&self, actor: &Actor, user_id: &str, to: RoleName) -> DomainResult<User> {
        let target = self.target(user_id).await?;
        check_promotion(target.user_type, to, actor.role)?;
        self.apply(actor, target, to).await
    }

    /// `to` defaults to the bottom tier.
    pub async fn demote(
        &self,
        actor: &Actor,
        user_id: &str,
        to: Option<RoleName>,
    ) -> DomainResult<User> {
        let target = self.target(user_id).await?;
        check_demotion(target.user_type, to.unwrap_or(RoleName::DEFAULT), actor.role)?;
        self.apply(actor, target, to.unwrap_or(RoleName::DEFAULT))
            .await
    }

    pub async fn change_role(&self, actor: &Actor, user_id: &str, to: RoleName) -> DomainResult<User> {
        let target = self.target(user_id).await?;
        check_direct_change(target.user_type, to, actor.role)?;
        self.apply(actor, target, to).await
    }
}
