use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};

use super::permission_repository::permission_model_to_domain;
use super::{db_err, unique_or_db_err};
use crate::domain::rbac::{NewRole, UpdateRole};
use crate::domain::{DomainError, DomainResult, Permission, Role, RoleRepositoryInterface};
use crate::infrastructure::database::entities::{permission, role, role_permission, user_role};

pub struct RoleRepository {
    db: DatabaseConnection,
}

impl RoleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn role_model_to_domain(model: role::Model) -> Role {
    Role {
        id: model.id,
        name: model.name,
        description: model.description,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl RoleRepositoryInterface for RoleRepository {
    async fn list_roles(&self) -> DomainResult<Vec<Role>> {
        let models = role::Entity::find()
            .order_by_asc(role::Column::CreatedAt)
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(role_model_to_domain).collect())
    }

    async fn get_role_by_id(&self, id: &str) -> DomainResult<Option<Role>> {
        let model = role::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(role_model_to_domain))
    }

    async fn get_role_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        let model = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(role_model_to_domain))
    }

    async fn create_role(&self, new_role: NewRole) -> DomainResult<Role> {
        let now = Utc::now();
        let model = role::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(new_role.name),
            description: Set(new_role.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| unique_or_db_err(e, "Role name already exists"))?;

        Ok(role_model_to_domain(model))
    }

    async fn update_role(&self, id: &str, changes: UpdateRole) -> DomainResult<Option<Role>> {
        let Some(existing) = role::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut active: role::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| unique_or_db_err(e, "Role name already exists"))?;

        Ok(Some(role_model_to_domain(updated)))
    }

    async fn delete_role(&self, id: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let holders = user_role::Entity::find()
            .filter(user_role::Column::RoleId.eq(id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if holders > 0 {
            return Err(DomainError::Conflict(format!(
                "Role is still assigned to {} user(s)",
                holders
            )));
        }

        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let result = role::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Role", "id", id));
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_role_permissions(&self, role_id: &str) -> DomainResult<Vec<Permission>> {
        let models = permission::Entity::find()
            .join(JoinType::InnerJoin, permission::Relation::RolePermissions.def())
            .filter(role_permission::Column::RoleId.eq(role_id))
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(permission_model_to_domain).collect())
    }

    async fn grant_permission(&self, role_id: &str, permission_id: &str) -> DomainResult<bool> {
        let existing = role_permission::Entity::find_by_id((
            role_id.to_string(),
            permission_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(db_err)?;
        if existing.is_some() {
            return Ok(false);
        }

        role_permission::ActiveModel {
            role_id: Set(role_id.to_string()),
            permission_id: Set(permission_id.to_string()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| unique_or_db_err(e, "Permission already granted"))?;

        Ok(true)
    }

    async fn revoke_permission(&self, role_id: &str, permission_id: &str) -> DomainResult<bool> {
        let result = role_permission::Entity::delete_by_id((
            role_id.to_string(),
            permission_id.to_string(),
        ))
        .exec(&self.db)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoleName;
    use crate::infrastructure::database::migrator::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> RoleRepository {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        RoleRepository::new(db)
    }

    #[tokio::test]
    async fn builtin_roles_are_seeded() {
        let repo = setup().await;
        let roles = repo.list_roles().await.unwrap();
        assert_eq!(roles.len(), 4);
        for name in RoleName::ALL {
            assert!(repo.get_role_by_name(name.as_str()).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn seeded_grants_follow_the_tiers() {
        let repo = setup().await;
        let user = repo.get_role_by_name("user").await.unwrap().unwrap();
        let admin = repo.get_role_by_name("admin").await.unwrap().unwrap();

        let user_perms = repo.list_role_permissions(&user.id).await.unwrap();
        let admin_perms = repo.list_role_permissions(&admin.id).await.unwrap();

        assert!(user_perms.iter().any(|p| p.name == "user:read:self"));
        assert!(!user_perms.iter().any(|p| p.name == "user:read:all"));
        assert!(admin_perms.iter().any(|p| p.name == "user:read:all"));
        assert!(admin_perms.len() > user_perms.len());
    }

    #[tokio::test]
    async fn grant_and_revoke_report_changes() {
        let repo = setup().await;
        let role = repo
            .create_role(NewRole {
                name: "auditor".to_string(),
                description: "Reads things".to_string(),
            })
            .await
            .unwrap();
        let perm = permission::Entity::find()
            .filter(permission::Column::Name.eq("role:read"))
            .one(&repo.db)
            .await
            .unwrap()
            .unwrap();

        assert!(repo.grant_permission(&role.id, &perm.id).await.unwrap());
        assert!(!repo.grant_permission(&role.id, &perm.id).await.unwrap());
        assert_eq!(repo.list_role_permissions(&role.id).await.unwrap().len(), 1);

        assert!(repo.revoke_permission(&role.id, &perm.id).await.unwrap());
        assert!(!repo.revoke_permission(&role.id, &perm.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_role_name_is_conflict() {
        let repo = setup().await;
        let err = repo
            .create_role(NewRole {
                name: "admin".to_string(),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_role_removes_grants() {
        let repo = setup().await;
        let role = repo
            .create_role(NewRole {
                name: "temp".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let perm = permission::Entity::find().one(&repo.db).await.unwrap().unwrap();
        repo.grant_permission(&role.id, &perm.id).await.unwrap();

        repo.delete_role(&role.id).await.unwrap();

        assert!(repo.get_role_by_id(&role.id).await.unwrap().is_none());
        let left = role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.eq(role.id.as_str()))
            .count(&repo.db)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }
}
