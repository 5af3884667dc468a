//! Permission names, permission sets and the any-of authorization rule.

use std::collections::BTreeSet;

use super::RoleName;

pub const USER_READ_SELF: &str = "user:read:self";
pub const USER_READ_ALL: &str = "user:read:all";
pub const USER_UPDATE_SELF: &str = "user:update:self";
pub const USER_UPDATE_ALL: &str = "user:update:all";
pub const USER_DELETE_SELF: &str = "user:delete:self";
pub const USER_DELETE_ALL: &str = "user:delete:all";
pub const USER_PROMOTE_MODERATOR: &str = "user:promote:moderator";
pub const USER_PROMOTE_ADMIN: &str = "user:promote:admin";
pub const USER_PROMOTE_SYSTEM_ADMIN: &str = "user:promote:system_admin";
pub const USER_DEMOTE: &str = "user:demote";
pub const ROLE_READ: &str = "role:read";
pub const ROLE_CREATE: &str = "role:create";
pub const ROLE_UPDATE: &str = "role:update";
pub const ROLE_DELETE: &str = "role:delete";
pub const PERMISSION_READ: &str = "permission:read";
pub const PERMISSION_CREATE: &str = "permission:create";
pub const PERMISSION_UPDATE: &str = "permission:update";
pub const PERMISSION_DELETE: &str = "permission:delete";
// Legacy aliases still accepted on the role listing.
pub const ADMIN_READ: &str = "admin:read";
pub const SYSTEM_ADMIN_READ: &str = "system_admin:read";

/// A seeded permission.
#[derive(Debug, Clone, Copy)]
pub struct PermissionDef {
    pub name: &'static str,
    pub resource: &'static str,
    pub action: &'static str,
    pub description: &'static str,
}

const fn def(
    name: &'static str,
    resource: &'static str,
    action: &'static str,
    description: &'static str,
) -> PermissionDef {
    PermissionDef {
        name,
        resource,
        action,
        description,
    }
}

pub const CATALOG: &[PermissionDef] = &[
    def(USER_READ_SELF, "user", "read", "Read own profile"),
    def(USER_READ_ALL, "user", "read", "Read any profile"),
    def(USER_UPDATE_SELF, "user", "update", "Update own profile"),
    def(USER_UPDATE_ALL, "user", "update", "Update any profile"),
    def(USER_DELETE_SELF, "user", "delete", "Request deletion of own account"),
    def(USER_DELETE_ALL, "user", "delete", "Delete accounts that requested it"),
    def(USER_PROMOTE_MODERATOR, "user", "promote", "Promote a user to moderator"),
    def(USER_PROMOTE_ADMIN, "user", "promote", "Promote a moderator to admin"),
    def(USER_PROMOTE_SYSTEM_ADMIN, "user", "promote", "Promote an admin to system admin"),
    def(USER_DEMOTE, "user", "demote", "Demote an account"),
    def(ROLE_READ, "role", "read", "List and read roles"),
    def(ROLE_CREATE, "role", "create", "Create roles"),
    def(ROLE_UPDATE, "role", "update", "Update roles"),
    def(ROLE_DELETE, "role", "delete", "Delete roles"),
    def(PERMISSION_READ, "permission", "read", "List and read permissions"),
    def(PERMISSION_CREATE, "permission", "create", "Create permissions"),
    def(PERMISSION_UPDATE, "permission", "update", "Update permissions"),
    def(PERMISSION_DELETE, "permission", "delete", "Delete permissions"),
];

const USER_GRANTS: &[&str] = &[USER_READ_SELF, USER_UPDATE_SELF, USER_DELETE_SELF];
const MODERATOR_GRANTS: &[&str] = &[USER_READ_ALL];
const ADMIN_GRANTS: &[&str] = &[
    USER_UPDATE_ALL,
    USER_DELETE_ALL,
    USER_PROMOTE_MODERATOR,
    USER_PROMOTE_ADMIN,
    USER_DEMOTE,
    ROLE_READ,
    ROLE_CREATE,
    ROLE_UPDATE,
    ROLE_DELETE,
    PERMISSION_READ,
    PERMISSION_CREATE,
    PERMISSION_UPDATE,
    PERMISSION_DELETE,
];

/// Seeded grants. Each tier inherits everything below it and the system
/// admin holds the full catalog.
pub fn default_grants(role: RoleName) -> Vec<&'static str> {
    match role {
        RoleName::SystemAdmin => CATALOG.iter().map(|p| p.name).collect(),
        _ => {
            let tiers: &[&[&str]] = &[USER_GRANTS, MODERATOR_GRANTS, ADMIN_GRANTS];
            tiers
                .iter()
                .take(role.rank() as usize + 1)
                .flat_map(|tier| tier.iter().copied())
                .collect()
        }
    }
}

/// Permission names held by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Any-of check: true when `available` holds at least one of `required`.
/// An empty requirement grants nothing.
pub fn authorize<I, S>(required: I, available: &PermissionSet) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    required
        .into_iter()
        .any(|name| available.contains(name.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_of_semantics() {
        assert!(authorize(["a", "b"], &PermissionSet::from_iter(["b"])));
        assert!(!authorize(["a", "b"], &PermissionSet::from_iter(["c"])));
        assert!(!authorize(["a"], &PermissionSet::new()));
        assert!(!authorize(Vec::<&str>::new(), &PermissionSet::from_iter(["a"])));
    }

    #[test]
    fn grants_are_cumulative() {
        let user = default_grants(RoleName::User);
        let moderator = default_grants(RoleName::Moderator);
        let admin = default_grants(RoleName::Admin);
        let system = default_grants(RoleName::SystemAdmin);

        assert!(user.iter().all(|p| moderator.contains(p)));
        assert!(moderator.iter().all(|p| admin.contains(p)));
        assert!(admin.iter().all(|p| system.contains(p)));

        assert!(!user.contains(&USER_READ_ALL));
        assert!(moderator.contains(&USER_READ_ALL));
        assert!(!admin.contains(&USER_PROMOTE_SYSTEM_ADMIN));
        assert_eq!(system.len(), CATALOG.len());
    }

    #[test]
    fn catalog_names_follow_resource_action() {
        for p in CATALOG {
            let mut parts = p.name.split(':');
            assert_eq!(parts.next(), Some(p.resource));
            assert_eq!(parts.next(), Some(p.action));
        }
    }
}
