//! Built-in role hierarchy and the transition table that governs it.
//!
//! The ordering `user < moderator < admin < system_admin` is policy. It is
//! spelled out in [`RoleName::rank`] and never derived from storage order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    User,
    Moderator,
    Admin,
    SystemAdmin,
}

impl RoleName {
    pub const ALL: [RoleName; 4] = [
        RoleName::User,
        RoleName::Moderator,
        RoleName::Admin,
        RoleName::SystemAdmin,
    ];

    /// Role given to every account when its email is verified.
    pub const DEFAULT: RoleName = RoleName::User;

    pub const fn rank(self) -> u8 {
        match self {
            RoleName::User => 0,
            RoleName::Moderator => 1,
            RoleName::Admin => 2,
            RoleName::SystemAdmin => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RoleName::User => "user",
            RoleName::Moderator => "moderator",
            RoleName::Admin => "admin",
            RoleName::SystemAdmin => "system_admin",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            RoleName::User => "Regular account with access to its own profile",
            RoleName::Moderator => "Can read every account",
            RoleName::Admin => "Manages accounts, roles and permissions",
            RoleName::SystemAdmin => "Full control, including admin promotion",
        }
    }

    /// Admin-tier roles pass the coarse administrative checks.
    pub fn is_administrator(self) -> bool {
        matches!(self, RoleName::Admin | RoleName::SystemAdmin)
    }
}

impl PartialOrd for RoleName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RoleName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for RoleName {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(RoleName::User),
            "moderator" => Ok(RoleName::Moderator),
            "admin" => Ok(RoleName::Admin),
            "system_admin" | "system-admin" | "systemadmin" => Ok(RoleName::SystemAdmin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// One row of the transition table: where an account holding `role` may go
/// and who may move it.
#[derive(Debug)]
pub struct RoleTransition {
    pub role: RoleName,
    pub promote_to: Option<RoleName>,
    pub demote_to: &'static [RoleName],
    pub actors: &'static [RoleName],
}

/// Indexed by [`RoleName::rank`].
pub const ROLE_TRANSITIONS: [RoleTransition; 4] = [
    RoleTransition {
        role: RoleName::User,
        promote_to: Some(RoleName::Moderator),
        demote_to: &[],
        actors: &[RoleName::Admin, RoleName::SystemAdmin],
    },
    RoleTransition {
        role: RoleName::Moderator,
        promote_to: Some(RoleName::Admin),
        demote_to: &[RoleName::User],
        actors: &[RoleName::Admin, RoleName::SystemAdmin],
    },
    RoleTransition {
        role: RoleName::Admin,
        promote_to: Some(RoleName::SystemAdmin),
        demote_to: &[RoleName::Moderator, RoleName::User],
        actors: &[RoleName::SystemAdmin],
    },
    RoleTransition {
        role: RoleName::SystemAdmin,
        promote_to: None,
        demote_to: &[],
        actors: &[],
    },
];

pub fn transition_for(role: RoleName) -> &'static RoleTransition {
    &ROLE_TRANSITIONS[role.rank() as usize]
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{0} accounts are protected and cannot change role")]
    Protected(RoleName),

    #[error("a {from} cannot be moved to {to}")]
    NotAllowed { from: RoleName, to: RoleName },

    #[error("a {actor} cannot change the role of a {target}")]
    ActorNotPermitted { actor: RoleName, target: RoleName },

    #[error("user already has role {0}")]
    Unchanged(RoleName),
}

fn check_actor(row: &RoleTransition, actor: RoleName) -> Result<(), TransitionError> {
    if row.actors.contains(&actor) {
        Ok(())
    } else {
        Err(TransitionError::ActorNotPermitted {
            actor,
            target: row.role,
        })
    }
}

/// One step up the hierarchy, exactly as the table allows.
pub fn check_promotion(
    current: RoleName,
    target: RoleName,
    actor: RoleName,
) -> Result<(), TransitionError> {
    let row = transition_for(current);
    if row.promote_to.is_none() {
        return Err(TransitionError::Protected(current));
    }
    if row.promote_to != Some(target) {
        return Err(TransitionError::NotAllowed {
            from: current,
            to: target,
        });
    }
    check_actor(row, actor)
}

pub fn check_demotion(
    current: RoleName,
    target: RoleName,
    actor: RoleName,
) -> Result<(), TransitionError> {
    let row = transition_for(current);
    if current == RoleName::SystemAdmin {
        return Err(TransitionError::Protected(current));
    }
    if !row.demote_to.contains(&target) {
        return Err(TransitionError::NotAllowed {
            from: current,
            to: target,
        });
    }
    check_actor(row, actor)
}

/// Direct role assignment. Accepts any move the table allows except raising
/// a plain user, who only leaves the bottom tier through promotion.
pub fn check_direct_change(
    current: RoleName,
    target: RoleName,
    actor: RoleName,
) -> Result<(), TransitionError> {
    if current == target {
        return Err(TransitionError::Unchanged(current));
    }
    if current == RoleName::SystemAdmin {
        return Err(TransitionError::Protected(current));
    }
    if current == RoleName::User {
        return Err(TransitionError::NotAllowed {
            from: current,
            to: target,
        });
    }
    let row = transition_for(current);
    if row.promote_to == Some(target) || row.demote_to.contains(&target) {
        check_actor(row, actor)
    } else {
        Err(TransitionError::NotAllowed {
            from: current,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RoleName::*;

    #[test]
    fn table_is_indexed_by_rank() {
        for (i, row) in ROLE_TRANSITIONS.iter().enumerate() {
            assert_eq!(row.role.rank() as usize, i);
        }
    }

    #[test]
    fn ordering_is_explicit() {
        assert!(User < Moderator);
        assert!(Moderator < Admin);
        assert!(Admin < SystemAdmin);
        let mut roles = vec![SystemAdmin, User, Admin, Moderator];
        roles.sort();
        assert_eq!(roles, RoleName::ALL.to_vec());
    }

    #[test]
    fn names_round_trip() {
        for role in RoleName::ALL {
            assert_eq!(role.as_str().parse::<RoleName>().unwrap(), role);
        }
        assert_eq!("System-Admin".parse::<RoleName>().unwrap(), SystemAdmin);
        assert!("superuser".parse::<RoleName>().is_err());
    }

    #[test]
    fn promotion_is_stepwise() {
        assert!(check_promotion(User, Moderator, Admin).is_ok());
        assert_eq!(
            check_promotion(User, Admin, SystemAdmin),
            Err(TransitionError::NotAllowed { from: User, to: Admin })
        );
        assert!(check_promotion(Moderator, Admin, Admin).is_ok());
        assert!(check_promotion(Admin, SystemAdmin, SystemAdmin).is_ok());
        assert_eq!(
            check_promotion(SystemAdmin, SystemAdmin, SystemAdmin),
            Err(TransitionError::Protected(SystemAdmin))
        );
    }

    #[test]
    fn promotion_requires_a_listed_actor() {
        assert_eq!(
            check_promotion(User, Moderator, Moderator),
            Err(TransitionError::ActorNotPermitted {
                actor: Moderator,
                target: User
            })
        );
        assert!(check_promotion(Admin, SystemAdmin, Admin).is_err());
    }

    #[test]
    fn demotion_follows_table() {
        assert!(check_demotion(Moderator, User, Admin).is_ok());
        assert!(check_demotion(Admin, Moderator, SystemAdmin).is_ok());
        assert!(check_demotion(Admin, User, SystemAdmin).is_ok());
        assert!(check_demotion(Admin, User, Admin).is_err());
        assert!(matches!(
            check_demotion(User, User, SystemAdmin),
            Err(TransitionError::NotAllowed { .. })
        ));
        assert_eq!(
            check_demotion(SystemAdmin, Admin, SystemAdmin),
            Err(TransitionError::Protected(SystemAdmin))
        );
    }

    #[test]
    fn direct_change_cannot_raise_plain_users() {
        for target in [Moderator, Admin, SystemAdmin] {
            assert!(matches!(
                check_direct_change(User, target, SystemAdmin),
                Err(TransitionError::NotAllowed { .. })
            ));
        }
        assert!(check_direct_change(Moderator, User, Admin).is_ok());
        assert!(check_direct_change(Moderator, Admin, Admin).is_ok());
        assert!(check_direct_change(Moderator, SystemAdmin, SystemAdmin).is_err());
        assert!(check_direct_change(Admin, User, SystemAdmin).is_ok());
        assert_eq!(
            check_direct_change(Admin, Admin, SystemAdmin),
            Err(TransitionError::Unchanged(Admin))
        );
    }
}
