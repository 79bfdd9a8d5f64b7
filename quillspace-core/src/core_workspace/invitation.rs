//! Invitation entity and its state machine
//!
//! Invitations are an append-only audit trail: rows are never deleted, and
//! status moves only forward from Pending into exactly one terminal state.
//! Expiry is evaluated lazily on every read path instead of by a background
//! sweep, so correctness never depends on a scheduler.

use super::error::{WorkspaceError, WorkspaceResult};
use super::role::Role;
use super::types::{InviteToken, Timestamp, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Default expiry horizon for new invitations
pub const DEFAULT_EXPIRATION_DAYS: u32 = 7;

/// Invitation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationStatus {
    /// Initial state; the only state operations act on
    Pending,
    /// Terminal: accepted and a membership was materialized
    Accepted,
    /// Terminal: expiry horizon passed before acceptance
    Expired,
    /// Terminal: withdrawn by the inviter or a workspace manager
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "Pending",
            InvitationStatus::Accepted => "Accepted",
            InvitationStatus::Expired => "Expired",
            InvitationStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(InvitationStatus::Pending),
            "Accepted" => Some(InvitationStatus::Accepted),
            "Expired" => Some(InvitationStatus::Expired),
            "Cancelled" => Some(InvitationStatus::Cancelled),
            _ => None,
        }
    }

    /// True once the status can never change again
    pub fn is_terminal(&self) -> bool {
        *self != InvitationStatus::Pending
    }
}

/// Time-boxed, single-use offer of a role in a workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Unguessable public handle; primary key
    pub token: InviteToken,

    /// Workspace the invitation grants access to
    pub workspace_id: WorkspaceId,

    /// Who created the invitation
    pub invited_by_email: String,

    /// Who the invitation is addressed to
    pub invited_email: String,

    /// Role granted on acceptance
    pub role: Role,

    /// Lifecycle status
    pub status: InvitationStatus,

    /// Optional note from the inviter, delivered with the notification
    pub custom_message: Option<String>,

    /// When the invitation was created
    pub created_at: Timestamp,

    /// When the invitation stops being acceptable
    pub expires_at: Timestamp,

    /// Set exactly once, on acceptance
    pub accepted_at: Option<Timestamp>,
}

impl Invitation {
    /// Create a new Pending invitation
    ///
    /// `expiration_days` overrides the 7-day horizon when positive; zero or
    /// absent falls back to the default.
    pub fn new(
        workspace_id: WorkspaceId,
        invited_by_email: String,
        invited_email: String,
        role: Role,
        custom_message: Option<String>,
        expiration_days: Option<u32>,
    ) -> Self {
        let now = Timestamp::now();
        let days = match expiration_days {
            Some(days) if days > 0 => days,
            _ => DEFAULT_EXPIRATION_DAYS,
        };

        Invitation {
            token: InviteToken::generate(),
            workspace_id,
            invited_by_email,
            invited_email,
            role,
            status: InvitationStatus::Pending,
            custom_message,
            created_at: now,
            expires_at: now.plus_days(days),
            accepted_at: None,
        }
    }

    /// True if the expiry horizon has passed
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Transition Pending → Accepted, recording the acceptance time
    pub fn mark_accepted(&mut self, now: Timestamp) -> WorkspaceResult<()> {
        self.transition(InvitationStatus::Accepted)?;
        self.accepted_at = Some(now);
        Ok(())
    }

    /// Transition Pending → Expired
    pub fn mark_expired(&mut self) -> WorkspaceResult<()> {
        self.transition(InvitationStatus::Expired)
    }

    /// Transition Pending → Cancelled
    pub fn mark_cancelled(&mut self) -> WorkspaceResult<()> {
        self.transition(InvitationStatus::Cancelled)
    }

    fn transition(&mut self, next: InvitationStatus) -> WorkspaceResult<()> {
        if self.status.is_terminal() {
            return Err(WorkspaceError::Validation(format!(
                "invitation already processed (status {})",
                self.status.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}
