//! Workspace roles and the capability table
//!
//! The capability table is the single source of truth for what a role may
//! do. Callers ask capability questions through [`Role::capabilities`] and
//! never compare role tags directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Workspace-level roles, in decreasing order of privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full control, can manage and delete the workspace
    Owner,
    /// Can manage members, invitations, and pages
    Admin,
    /// Default role, can create and edit pages
    Member,
    /// Read-only access
    Guest,
}

/// All roles, most privileged first
pub const ALL_ROLES: [Role; 4] = [Role::Owner, Role::Admin, Role::Member, Role::Guest];

impl Role {
    /// Privilege rank; higher means more privileged
    pub fn privilege(&self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Admin => 2,
            Role::Member => 1,
            Role::Guest => 0,
        }
    }

    /// The fixed capability set for this role
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Role::Owner => Capabilities {
                can_manage_workspace: true,
                can_invite_and_delete_users: true,
                can_delete_page: true,
                can_edit_page: true,
                can_view_page: true,
            },
            Role::Admin => Capabilities {
                can_manage_workspace: false,
                can_invite_and_delete_users: true,
                can_delete_page: true,
                can_edit_page: true,
                can_view_page: true,
            },
            Role::Member => Capabilities {
                can_manage_workspace: false,
                can_invite_and_delete_users: false,
                can_delete_page: false,
                can_edit_page: true,
                can_view_page: true,
            },
            Role::Guest => Capabilities {
                can_manage_workspace: false,
                can_invite_and_delete_users: false,
                can_delete_page: false,
                can_edit_page: false,
                can_view_page: true,
            },
        }
    }

    /// Convert Role to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Admin => "Admin",
            Role::Member => "Member",
            Role::Guest => "Guest",
        }
    }

    /// Parse a string into a Role
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Owner" => Some(Role::Owner),
            "Admin" => Some(Role::Admin),
            "Member" => Some(Role::Member),
            "Guest" => Some(Role::Guest),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability flags granted by a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Rename, reconfigure, or delete the workspace
    pub can_manage_workspace: bool,
    /// Invite new members and remove existing ones
    pub can_invite_and_delete_users: bool,
    /// Delete pages
    pub can_delete_page: bool,
    /// Create and edit pages
    pub can_edit_page: bool,
    /// View pages
    pub can_view_page: bool,
}

impl Capabilities {
    /// No capabilities at all; the answer for non-members
    pub fn none() -> Self {
        Capabilities {
            can_manage_workspace: false,
            can_invite_and_delete_users: false,
            can_delete_page: false,
            can_edit_page: false,
            can_view_page: false,
        }
    }

    fn as_flags(&self) -> [bool; 5] {
        [
            self.can_manage_workspace,
            self.can_invite_and_delete_users,
            self.can_delete_page,
            self.can_edit_page,
            self.can_view_page,
        ]
    }

    /// True if every capability granted by `other` is also granted here
    pub fn covers(&self, other: &Capabilities) -> bool {
        self.as_flags()
            .iter()
            .zip(other.as_flags().iter())
            .all(|(mine, theirs)| *mine || !*theirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in ALL_ROLES {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("Superuser"), None);
    }

    #[test]
    fn test_privilege_ordering() {
        assert!(Role::Owner.privilege() > Role::Admin.privilege());
        assert!(Role::Admin.privilege() > Role::Member.privilege());
        assert!(Role::Member.privilege() > Role::Guest.privilege());
    }

    /// Owner ⊇ Admin ⊇ Member ⊇ Guest over the full capability matrix
    #[test]
    fn test_capability_monotonicity() {
        for higher in ALL_ROLES {
            for lower in ALL_ROLES {
                if higher.privilege() >= lower.privilege() {
                    assert!(
                        higher.capabilities().covers(&lower.capabilities()),
                        "{} should cover every capability of {}",
                        higher,
                        lower
                    );
                }
            }
        }
    }

    #[test]
    fn test_guest_is_view_only() {
        let caps = Role::Guest.capabilities();
        assert!(caps.can_view_page);
        assert!(!caps.can_edit_page);
        assert!(!caps.can_delete_page);
        assert!(!caps.can_invite_and_delete_users);
        assert!(!caps.can_manage_workspace);
    }

    #[test]
    fn test_only_owner_manages_workspace() {
        for role in ALL_ROLES {
            let expected = role == Role::Owner;
            assert_eq!(role.capabilities().can_manage_workspace, expected);
        }
    }

    #[test]
    fn test_none_grants_nothing() {
        let none = Capabilities::none();
        assert!(Role::Guest.capabilities().covers(&none));
        assert!(!none.covers(&Role::Guest.capabilities()));
    }
}
