//! Database repository implementations
//!
//! One SeaORM repository per aggregate, plus [`AccessRepository`] for the
//! writes that must touch users and roles in the same transaction.

pub mod access_repository;
pub mod permission_repository;
pub mod role_repository;
pub mod user_repository;

pub use access_repository::AccessRepository;
pub use permission_repository::PermissionRepository;
pub use role_repository::RoleRepository;
pub use user_repository::UserRepository;

use crate::domain::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Internal(format!("Database error: {}", e))
}

/// UNIQUE violations become `Conflict`; everything else stays internal.
pub(crate) fn unique_or_db_err(e: sea_orm::DbErr, conflict: &str) -> DomainError {
    let text = e.to_string();
    if text.contains("UNIQUE") || text.contains("duplicate") {
        DomainError::Conflict(conflict.to_string())
    } else {
        db_err(e)
    }
}
