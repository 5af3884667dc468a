pub mod rbac;
pub mod user;

pub use rbac::{
    AccessRepositoryInterface, Permission, PermissionRepositoryInterface, PermissionSet, Role,
    RoleName, RoleRepositoryInterface,
};
pub use user::{CreateUserDto, GetUserDto, UpdateUserDto, User, UserRepositoryInterface};

pub use crate::shared::{DomainError, DomainResult};
