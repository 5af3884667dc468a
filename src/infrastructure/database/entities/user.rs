//! User entity for database

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::RoleName;

/// Denormalized copy of the user's role
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum UserType {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "moderator")]
    Moderator,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "system_admin")]
    SystemAdmin,
}

impl From<RoleName> for UserType {
    fn from(role: RoleName) -> Self {
        match role {
            RoleName::User => UserType::User,
            RoleName::Moderator => UserType::Moderator,
            RoleName::Admin => UserType::Admin,
            RoleName::SystemAdmin => UserType::SystemAdmin,
        }
    }
}

impl From<UserType> for RoleName {
    fn from(user_type: UserType) -> Self {
        match user_type {
            UserType::User => RoleName::User,
            UserType::Moderator => RoleName::Moderator,
            UserType::Admin => RoleName::Admin,
            UserType::SystemAdmin => RoleName::SystemAdmin,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub email_verified: bool,
    pub active: bool,
    pub deletion_requested: bool,
    pub verification_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRoles,
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
