//! Membership entity and its materialization rules
//!
//! A Membership binds one account to one workspace with a role and status.
//! At most one row exists per (workspace, email); the store enforces that
//! with a uniqueness constraint. Owner rows are created only by the
//! workspace-creation path; the generic materialization path can never
//! emit Owner.

use super::error::{WorkspaceError, WorkspaceResult};
use super::role::Role;
use super::types::{MembershipId, Timestamp, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
    /// Full member; the only status that participates in authorization
    Active,
    /// Reserved for a direct-add flow that has not been exercised yet
    Invited,
    /// Administratively suspended; retains the row but grants nothing
    Suspended,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "Active",
            MembershipStatus::Invited => "Invited",
            MembershipStatus::Suspended => "Suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(MembershipStatus::Active),
            "Invited" => Some(MembershipStatus::Invited),
            "Suspended" => Some(MembershipStatus::Suspended),
            _ => None,
        }
    }
}

/// Relationship between an account and a workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier
    pub id: MembershipId,

    /// Workspace this membership belongs to
    pub workspace_id: WorkspaceId,

    /// Identity key of the account
    pub account_email: String,

    /// Role granted by this membership
    pub role: Role,

    /// Lifecycle status
    pub status: MembershipStatus,

    /// When the membership was created
    pub created_at: Timestamp,

    /// Last role or status change
    pub updated_at: Timestamp,
}

impl Membership {
    /// Create the Owner membership for a freshly created workspace
    ///
    /// This is the only constructor that emits `Role::Owner`.
    pub fn owner(workspace_id: WorkspaceId, account_email: String) -> Self {
        let now = Timestamp::now();
        Membership {
            id: MembershipId::generate(),
            workspace_id,
            account_email,
            role: Role::Owner,
            status: MembershipStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Materialize a non-owner membership
    ///
    /// Used on invitation acceptance (Active) and reserved for the direct-add
    /// flow (Invited). Rejects `Role::Owner`.
    pub fn materialize(
        workspace_id: WorkspaceId,
        account_email: String,
        role: Role,
        status: MembershipStatus,
    ) -> WorkspaceResult<Self> {
        if role == Role::Owner {
            return Err(WorkspaceError::Validation(
                "owner memberships are created only at workspace creation".to_string(),
            ));
        }

        let now = Timestamp::now();
        Ok(Membership {
            id: MembershipId::generate(),
            workspace_id,
            account_email,
            role,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    /// True if this membership currently grants capabilities
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}
