//! Role-based access control: roles, permissions and how they connect.

pub mod model;
pub mod permission;
pub mod repository;
pub mod role;

pub use model::{
    NewPermission, NewRole, Permission, Role, RoleAssignment, UpdatePermission, UpdateRole,
    VerificationOutcome,
};
pub use permission::{authorize, default_grants, PermissionDef, PermissionSet, CATALOG};
pub use repository::{
    AccessRepositoryInterface, PermissionRepositoryInterface, RoleRepositoryInterface,
};
pub use role::{
    check_demotion, check_direct_change, check_promotion, transition_for, RoleName,
    RoleTransition, TransitionError, UnknownRole, ROLE_TRANSITIONS,
};

use crate::shared::DomainError;

impl From<TransitionError> for DomainError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Protected(_) | TransitionError::ActorNotPermitted { .. } => {
                DomainError::Forbidden(err.to_string())
            }
            TransitionError::NotAllowed { .. } | TransitionError::Unchanged(_) => {
                DomainError::Validation(err.to_string())
            }
        }
    }
}

impl From<UnknownRole> for DomainError {
    fn from(err: UnknownRole) -> Self {
        DomainError::Validation(err.to_string())
    }
}
