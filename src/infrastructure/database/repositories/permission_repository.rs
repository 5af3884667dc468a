use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::{db_err, unique_or_db_err};
use crate::domain::rbac::{NewPermission, UpdatePermission};
use crate::domain::{DomainError, DomainResult, Permission, PermissionRepositoryInterface};
use crate::infrastructure::database::entities::{permission, role_permission};

pub struct PermissionRepository {
    db: DatabaseConnection,
}

impl PermissionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn permission_model_to_domain(model: permission::Model) -> Permission {
    Permission {
        id: model.id,
        name: model.name,
        description: model.description,
        resource: model.resource,
        action: model.action,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl PermissionRepositoryInterface for PermissionRepository {
    async fn list_permissions(&self) -> DomainResult<Vec<Permission>> {
        let models = permission::Entity::find()
            .order_by_asc(permission::Column::Resource)
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(permission_model_to_domain).collect())
    }

    async fn get_permission_by_id(&self, id: &str) -> DomainResult<Option<Permission>> {
        let model = permission::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(permission_model_to_domain))
    }

    async fn get_permission_by_name(&self, name: &str) -> DomainResult<Option<Permission>> {
        let model = permission::Entity::find()
            .filter(permission::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(permission_model_to_domain))
    }

    async fn create_permission(&self, new_permission: NewPermission) -> DomainResult<Permission> {
        let now = Utc::now();
        let model = permission::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(new_permission.name),
            description: Set(new_permission.description),
            resource: Set(new_permission.resource),
            action: Set(new_permission.action),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| unique_or_db_err(e, "Permission name already exists"))?;

        Ok(permission_model_to_domain(model))
    }

    async fn update_permission(
        &self,
        id: &str,
        changes: UpdatePermission,
    ) -> DomainResult<Option<Permission>> {
        let Some(existing) = permission::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut active: permission::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(resource) = changes.resource {
            active.resource = Set(resource);
        }
        if let Some(action) = changes.action {
            active.action = Set(action);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| unique_or_db_err(e, "Permission name already exists"))?;

        Ok(Some(permission_model_to_domain(updated)))
    }

    async fn delete_permission(&self, id: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        role_permission::Entity::delete_many()
            .filter(role_permission::Column::PermissionId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let result = permission::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Permission", "id", id));
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rbac::CATALOG;
    use crate::infrastructure::database::migrator::{Migrator, MigratorTrait};
    use sea_orm::{Database, PaginatorTrait};

    async fn setup() -> PermissionRepository {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        PermissionRepository::new(db)
    }

    #[tokio::test]
    async fn catalog_is_seeded() {
        let repo = setup().await;
        let all = repo.list_permissions().await.unwrap();
        assert_eq!(all.len(), CATALOG.len());

        let read = repo.get_permission_by_name("user:read:self").await.unwrap().unwrap();
        assert_eq!(read.resource, "user");
        assert_eq!(read.action, "read");
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let repo = setup().await;
        let created = repo
            .create_permission(NewPermission {
                name: "report:read".to_string(),
                description: "Read reports".to_string(),
                resource: "report".to_string(),
                action: "read".to_string(),
            })
            .await
            .unwrap();

        let updated = repo
            .update_permission(
                &created.id,
                UpdatePermission {
                    description: Some("Read all reports".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "report:read");
        assert_eq!(updated.description, "Read all reports");

        assert!(repo
            .update_permission("missing", UpdatePermission::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_cascades_grants() {
        let repo = setup().await;
        let perm = repo.get_permission_by_name("role:read").await.unwrap().unwrap();

        repo.delete_permission(&perm.id).await.unwrap();

        assert!(repo.get_permission_by_id(&perm.id).await.unwrap().is_none());
        let grants = role_permission::Entity::find()
            .filter(role_permission::Column::PermissionId.eq(perm.id.as_str()))
            .count(&repo.db)
            .await
            .unwrap();
        assert_eq!(grants, 0);
    }
}
