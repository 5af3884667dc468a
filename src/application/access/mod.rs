//! Authorization and its administration
//!
//! - [`AuthorizationEvaluator`]: identity -> permission set -> allow/deny.
//! - [`AccessAdminService`]: role and permission CRUD, grants, and the
//!   promote / demote / change-role transitions.

pub mod admin;
pub mod evaluator;

pub use admin::{AccessAdminService, NewPermissionInput};
pub use evaluator::AuthorizationEvaluator;
