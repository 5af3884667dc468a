use std::sync::Arc;

use tracing::debug;

use crate::domain::rbac::authorize;
use crate::domain::{AccessRepositoryInterface, DomainResult, PermissionSet, RoleName};

/// Resolves what an identity may do. Resolution hits the store, so callers
/// only invoke it on routes that actually check a permission.
#[derive(Clone)]
pub struct AuthorizationEvaluator {
    access: Arc<dyn AccessRepositoryInterface>,
}

impl AuthorizationEvaluator {
    pub fn new(access: Arc<dyn AccessRepositoryInterface>) -> Self {
        Self { access }
    }

    /// Empty for a user without a role assignment, which denies everything.
    pub async fn resolve_permissions(&self, user_id: &str) -> DomainResult<PermissionSet> {
        let names = self.access.permissions_for_user(user_id).await?;
        debug!(user_id, count = names.len(), "Resolved permissions");
        Ok(names.into_iter().collect())
    }

    /// The role currently assigned in the store, which may differ from the
    /// role claim of an older session. `None` without an assignment.
    pub async fn current_role(&self, user_id: &str) -> DomainResult<Option<RoleName>> {
        let assignment = self.access.assignment_for_user(user_id).await?;
        Ok(assignment.and_then(|a| a.role_name.parse().ok()))
    }

    pub fn authorize(&self, required: &[&str], available: &PermissionSet) -> bool {
        authorize(required, available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::fixture;
    use crate::domain::{CreateUserDto, RoleName};

    #[tokio::test]
    async fn unassigned_user_is_denied_everything() {
        let f = fixture().await;
        let evaluator = AuthorizationEvaluator::new(f.access.clone());
        let user = f
            .users
            .create_user(CreateUserDto {
                username: "nobody".into(),
                email: "nobody@example.com".into(),
                first_name: None,
                last_name: None,
                password_hash: "hash".into(),
                user_type: RoleName::User,
                email_verified: false,
            })
            .await
            .unwrap();

        let perms = evaluator.resolve_permissions(&user.id).await.unwrap();
        assert!(perms.is_empty());
        assert!(!evaluator.authorize(&["user:read:self"], &perms));
    }

    #[tokio::test]
    async fn verified_user_gets_default_grants() {
        let f = fixture().await;
        let evaluator = AuthorizationEvaluator::new(f.access.clone());
        let user = f
            .users
            .create_user(CreateUserDto {
                username: "someone".into(),
                email: "someone@example.com".into(),
                first_name: None,
                last_name: None,
                password_hash: "hash".into(),
                user_type: RoleName::User,
                email_verified: false,
            })
            .await
            .unwrap();
        f.access
            .complete_verification(&user.id, RoleName::User, None)
            .await
            .unwrap();

        let perms = evaluator.resolve_permissions(&user.id).await.unwrap();
        assert!(evaluator.authorize(&["user:read:all", "user:read:self"], &perms));
        assert!(!evaluator.authorize(&["role:create"], &perms));
    }
}
