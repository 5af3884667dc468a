//! Role assignment storage.
//!
//! Every write here keeps `users.user_type` and the `user_roles` row in step,
//! so each one runs inside a single transaction.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};

use super::db_err;
use super::user_repository::{insert_user, user_model_to_domain};
use crate::domain::rbac::{RoleAssignment, VerificationOutcome};
use crate::domain::{
    AccessRepositoryInterface, CreateUserDto, DomainError, DomainResult, RoleName, User,
};
use crate::infrastructure::database::entities::{permission, role, role_permission, user, user_role};

pub struct AccessRepository {
    db: DatabaseConnection,
}

impl AccessRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn role_row<C: ConnectionTrait>(conn: &C, name: RoleName) -> DomainResult<role::Model> {
    role::Entity::find()
        .filter(role::Column::Name.eq(name.as_str()))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| DomainError::Internal(format!("built-in role '{}' is missing", name)))
}

async fn insert_assignment<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    role_id: &str,
    assigned_by: Option<&str>,
) -> DomainResult<()> {
    user_role::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        role_id: Set(role_id.to_string()),
        assigned_by: Set(assigned_by.map(str::to_string)),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl AccessRepositoryInterface for AccessRepository {
    async fn permissions_for_user(&self, user_id: &str) -> DomainResult<Vec<String>> {
        let held_roles = Query::select()
            .column(user_role::Column::RoleId)
            .from(user_role::Entity)
            .and_where(user_role::Column::UserId.eq(user_id))
            .to_owned();

        permission::Entity::find()
            .select_only()
            .column(permission::Column::Name)
            .distinct()
            .join(JoinType::InnerJoin, permission::Relation::RolePermissions.def())
            .filter(role_permission::Column::RoleId.in_subquery(held_roles))
            .order_by_asc(permission::Column::Name)
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn assignment_for_user(&self, user_id: &str) -> DomainResult<Option<RoleAssignment>> {
        let found = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .find_also_related(role::Entity)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(found.map(|(assignment, role)| RoleAssignment {
            user_id: assignment.user_id,
            role_name: role.map(|r| r.name).unwrap_or_default(),
            role_id: assignment.role_id,
            assigned_by: assignment.assigned_by,
            created_at: assignment.created_at,
        }))
    }

    async fn find_user_with_role(&self, role: RoleName) -> DomainResult<Option<String>> {
        let Some(role) = role::Entity::find()
            .filter(role::Column::Name.eq(role.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let holder = user_role::Entity::find()
            .filter(user_role::Column::RoleId.eq(role.id))
            .order_by_asc(user_role::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(holder.map(|h| h.user_id))
    }

    async fn complete_verification(
        &self,
        user_id: &str,
        role: RoleName,
        assigned_by: Option<&str>,
    ) -> DomainResult<VerificationOutcome> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))?;

        let assignment = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(db_err)?;

        if existing.email_verified && assignment.is_some() {
            return Ok(VerificationOutcome::AlreadyVerified);
        }

        let mut active: user::ActiveModel = existing.into();
        active.email_verified = Set(true);
        active.verification_token = Set(None);
        if assignment.is_none() {
            active.user_type = Set(role.into());
        }
        active.updated_at = Set(Utc::now());
        active.update(&txn).await.map_err(db_err)?;

        if assignment.is_none() {
            let role = role_row(&txn, role).await?;
            insert_assignment(&txn, user_id, &role.id, assigned_by).await?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(VerificationOutcome::Verified)
    }

    async fn change_user_role(
        &self,
        user_id: &str,
        role: RoleName,
        assigned_by: &str,
    ) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let assignment = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("RoleAssignment", "user_id", user_id))?;

        let target = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))?;

        let role_model = role_row(&txn, role).await?;

        let mut assignment: user_role::ActiveModel = assignment.into();
        assignment.role_id = Set(role_model.id);
        assignment.assigned_by = Set(Some(assigned_by.to_string()));
        assignment.update(&txn).await.map_err(db_err)?;

        let mut target: user::ActiveModel = target.into();
        target.user_type = Set(role.into());
        target.updated_at = Set(Utc::now());
        target.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn create_self_assigned_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let role = role_row(&txn, dto.user_type).await?;
        let created = insert_user(&txn, dto).await?;
        insert_assignment(&txn, &created.id, &role.id, Some(&created.id)).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(user_model_to_domain(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRepositoryInterface;
    use crate::infrastructure::database::migrator::{Migrator, MigratorTrait};
    use crate::infrastructure::database::repositories::UserRepository;
    use sea_orm::Database;

    async fn setup() -> (AccessRepository, UserRepository) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        (AccessRepository::new(db.clone()), UserRepository::new(db))
    }

    fn dto(username: &str, user_type: RoleName, verified: bool) -> CreateUserDto {
        CreateUserDto {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: None,
            last_name: None,
            password_hash: "hash".to_string(),
            user_type,
            email_verified: verified,
        }
    }

    #[tokio::test]
    async fn unverified_user_has_no_permissions() {
        let (access, users) = setup().await;
        let user = users.create_user(dto("carol", RoleName::User, false)).await.unwrap();

        assert!(access.permissions_for_user(&user.id).await.unwrap().is_empty());
        assert!(access.assignment_for_user(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verification_assigns_default_role_once() {
        let (access, users) = setup().await;
        let admin = access
            .create_self_assigned_user(dto("root", RoleName::SystemAdmin, true))
            .await
            .unwrap();
        let user = users.create_user(dto("dave", RoleName::User, false)).await.unwrap();
        users.set_verification_token(&user.id, Some("tok")).await.unwrap();

        let first = access
            .complete_verification(&user.id, RoleName::User, Some(&admin.id))
            .await
            .unwrap();
        let second = access
            .complete_verification(&user.id, RoleName::User, Some(&admin.id))
            .await
            .unwrap();
        assert_eq!(first, VerificationOutcome::Verified);
        assert_eq!(second, VerificationOutcome::AlreadyVerified);

        let stored = users.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.email_verified);
        assert!(stored.verification_token.is_none());

        let assignment = access.assignment_for_user(&user.id).await.unwrap().unwrap();
        assert_eq!(assignment.role_name, "user");
        assert_eq!(assignment.assigned_by.as_deref(), Some(admin.id.as_str()));

        let perms = access.permissions_for_user(&user.id).await.unwrap();
        assert!(perms.contains(&"user:read:self".to_string()));
        assert!(!perms.contains(&"user:read:all".to_string()));
    }

    #[tokio::test]
    async fn role_change_moves_both_records() {
        let (access, users) = setup().await;
        let admin = access
            .create_self_assigned_user(dto("root", RoleName::SystemAdmin, true))
            .await
            .unwrap();
        let user = users.create_user(dto("erin", RoleName::User, false)).await.unwrap();
        access
            .complete_verification(&user.id, RoleName::User, None)
            .await
            .unwrap();

        access
            .change_user_role(&user.id, RoleName::Moderator, &admin.id)
            .await
            .unwrap();

        let stored = users.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.user_type, RoleName::Moderator);
        let assignment = access.assignment_for_user(&user.id).await.unwrap().unwrap();
        assert_eq!(assignment.role_name, "moderator");
        assert!(access
            .permissions_for_user(&user.id)
            .await
            .unwrap()
            .contains(&"user:read:all".to_string()));
    }

    #[tokio::test]
    async fn role_change_without_assignment_is_not_found() {
        let (access, users) = setup().await;
        let user = users.create_user(dto("frank", RoleName::User, false)).await.unwrap();
        let err = access
            .change_user_role(&user.id, RoleName::Admin, "someone")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn system_admin_lookup_and_self_assignment() {
        let (access, users) = setup().await;
        assert!(access
            .find_user_with_role(RoleName::SystemAdmin)
            .await
            .unwrap()
            .is_none());

        let admin = access
            .create_self_assigned_user(dto("root", RoleName::SystemAdmin, true))
            .await
            .unwrap();

        assert_eq!(
            access.find_user_with_role(RoleName::SystemAdmin).await.unwrap(),
            Some(admin.id.clone())
        );
        let assignment = access.assignment_for_user(&admin.id).await.unwrap().unwrap();
        assert_eq!(assignment.assigned_by.as_deref(), Some(admin.id.as_str()));

        users.delete_user(&admin.id).await.unwrap();
        assert!(access.assignment_for_user(&admin.id).await.unwrap().is_none());
    }
}
