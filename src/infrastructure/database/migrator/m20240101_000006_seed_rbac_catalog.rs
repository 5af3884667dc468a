//! Seed the built-in roles, the permission catalog and the default grants.

use std::collections::HashMap;

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20240101_000002_create_roles::Roles;
use super::m20240101_000003_create_permissions::Permissions;
use super::m20240101_000004_create_role_permissions::RolePermissions;
use crate::domain::rbac::{default_grants, RoleName, CATALOG};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn exec(manager: &SchemaManager<'_>, stmt: &InsertStatement) -> Result<(), DbErr> {
    let db = manager.get_connection();
    db.execute(db.get_database_backend().build(stmt)).await?;
    Ok(())
}

fn seed_err(e: impl std::fmt::Display) -> DbErr {
    DbErr::Migration(e.to_string())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = chrono::Utc::now();

        let mut role_ids = HashMap::new();
        let mut roles = Query::insert();
        roles.into_table(Roles::Table).columns([
            Roles::Id,
            Roles::Name,
            Roles::Description,
            Roles::CreatedAt,
            Roles::UpdatedAt,
        ]);
        for role in RoleName::ALL {
            let id = uuid::Uuid::new_v4().to_string();
            roles
                .values([
                    id.clone().into(),
                    role.as_str().into(),
                    role.description().into(),
                    now.into(),
                    now.into(),
                ])
                .map_err(seed_err)?;
            role_ids.insert(role, id);
        }
        exec(manager, &roles).await?;

        let mut permission_ids = HashMap::new();
        let mut permissions = Query::insert();
        permissions.into_table(Permissions::Table).columns([
            Permissions::Id,
            Permissions::Name,
            Permissions::Description,
            Permissions::Resource,
            Permissions::Action,
            Permissions::CreatedAt,
            Permissions::UpdatedAt,
        ]);
        for def in CATALOG {
            let id = uuid::Uuid::new_v4().to_string();
            permissions
                .values([
                    id.clone().into(),
                    def.name.into(),
                    def.description.into(),
                    def.resource.into(),
                    def.action.into(),
                    now.into(),
                    now.into(),
                ])
                .map_err(seed_err)?;
            permission_ids.insert(def.name, id);
        }
        exec(manager, &permissions).await?;

        let mut grants = Query::insert();
        grants
            .into_table(RolePermissions::Table)
            .columns([RolePermissions::RoleId, RolePermissions::PermissionId]);
        for role in RoleName::ALL {
            for name in default_grants(role) {
                let permission_id = permission_ids
                    .get(name)
                    .ok_or_else(|| seed_err(format!("grant of unknown permission {}", name)))?;
                grants
                    .values([role_ids[&role].clone().into(), permission_id.clone().into()])
                    .map_err(seed_err)?;
            }
        }
        exec(manager, &grants).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        let role_names: Vec<&str> = RoleName::ALL.iter().map(|r| r.as_str()).collect();
        let permission_names: Vec<&str> = CATALOG.iter().map(|p| p.name).collect();

        let grants = Query::delete()
            .from_table(RolePermissions::Table)
            .and_where(
                Expr::col(RolePermissions::RoleId).in_subquery(
                    Query::select()
                        .column(Roles::Id)
                        .from(Roles::Table)
                        .and_where(Expr::col(Roles::Name).is_in(role_names.clone()))
                        .to_owned(),
                ),
            )
            .to_owned();
        db.execute(backend.build(&grants)).await?;

        let roles = Query::delete()
            .from_table(Roles::Table)
            .and_where(Expr::col(Roles::Name).is_in(role_names))
            .to_owned();
        db.execute(backend.build(&roles)).await?;

        let permissions = Query::delete()
            .from_table(Permissions::Table)
            .and_where(Expr::col(Permissions::Name).is_in(permission_names))
            .to_owned();
        db.execute(backend.build(&permissions)).await?;

        Ok(())
    }
}
