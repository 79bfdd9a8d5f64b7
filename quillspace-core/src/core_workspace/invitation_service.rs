//! Invitation service: creation, duplicate and expiry reconciliation, and
//! acceptance into a materialized membership
//!
//! Every decision re-reads the backing store; there is no cross-request
//! cache. The store's uniqueness constraints are the serialization points:
//! an optimistic check can race, and a constraint violation at write time is
//! the authoritative DUPLICATE / ALREADY_MEMBER outcome, never a generic
//! fault.

use super::collaborators::{IdentityDirectory, InvitationDelivery, NotificationSender};
use super::error::{WorkspaceError, WorkspaceResult};
use super::invitation::{Invitation, InvitationStatus};
use super::membership_service::{validate_email, MembershipService};
use super::role::Role;
use super::storage::{InvitationStore, StorageError, WorkspaceStore};
use super::types::{InviteToken, Timestamp, WorkspaceId};
use super::workspace::Workspace;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a successful create, including the delivery flag
///
/// The persisted row is the source of truth; `delivered = false` means the
/// email did not go out and the invitation can be resent.
#[derive(Debug)]
pub struct InvitationCreated {
    pub invitation: Invitation,
    pub delivered: bool,
}

/// Outcome of a successful acceptance
#[derive(Debug)]
pub struct InvitationAccepted {
    pub workspace_id: WorkspaceId,
    pub workspace_name: String,
    pub invited_email: String,
    pub role: Role,
    pub invited_at: Timestamp,
    pub accepted_at: Timestamp,
}

/// Service orchestrating the invitation lifecycle
pub struct InvitationService {
    invitations: Arc<dyn InvitationStore>,
    workspaces: Arc<dyn WorkspaceStore>,
    memberships: Arc<MembershipService>,
    directory: Arc<dyn IdentityDirectory>,
    notifier: Arc<dyn NotificationSender>,
}

impl InvitationService {
    pub fn new(
        invitations: Arc<dyn InvitationStore>,
        workspaces: Arc<dyn WorkspaceStore>,
        memberships: Arc<MembershipService>,
        directory: Arc<dyn IdentityDirectory>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            invitations,
            workspaces,
            memberships,
            directory,
            notifier,
        }
    }

    /// Create a Pending invitation and deliver it best-effort
    pub async fn create_invitation(
        &self,
        workspace_id: &WorkspaceId,
        email: &str,
        role: Role,
        custom_message: Option<String>,
        expiration_days: Option<u32>,
    ) -> WorkspaceResult<InvitationCreated> {
        logged(
            "create_invitation",
            self.create_inner(workspace_id, email, role, custom_message, expiration_days)
                .await,
        )
    }

    async fn create_inner(
        &self,
        workspace_id: &WorkspaceId,
        email: &str,
        role: Role,
        custom_message: Option<String>,
        expiration_days: Option<u32>,
    ) -> WorkspaceResult<InvitationCreated> {
        // Validation runs fully before any mutating call
        if workspace_id.0.trim().is_empty() {
            return Err(WorkspaceError::Validation(
                "workspace id must not be empty".to_string(),
            ));
        }
        validate_email(email)?;
        if role == Role::Owner {
            return Err(WorkspaceError::Validation(
                "ownership cannot be granted through an invitation".to_string(),
            ));
        }

        let inviter = self.memberships.authenticated_caller()?;
        if !self.memberships.can_invite_and_delete_users(workspace_id, &inviter) {
            return Err(WorkspaceError::Authorization(format!(
                "{} may not invite members to this workspace",
                inviter
            )));
        }

        let workspace = self.find_workspace(workspace_id)?;

        // Invitations only go to pre-registered identities
        let known = self
            .directory
            .exists(email)
            .await
            .map_err(|e| WorkspaceError::operation_failed("create_invitation", e))?;
        if !known {
            return Err(WorkspaceError::NotFound(format!(
                "no account is registered for {}",
                email
            )));
        }

        // Reconcile a stale pending row before rejecting as duplicate
        if let Some(mut pending) = self
            .invitations
            .find_pending(email, workspace_id)
            .map_err(|e| WorkspaceError::operation_failed("create_invitation", e))?
        {
            if pending.is_expired(Timestamp::now()) {
                pending.mark_expired()?;
                self.save_invitation(&pending, "create_invitation")?;
                return Err(WorkspaceError::Expired(format!(
                    "the previous invitation for {} expired; request a new one",
                    email
                )));
            }
            return Err(WorkspaceError::Duplicate(format!(
                "{} already has a pending invitation",
                email
            )));
        }

        if let Some(membership) = self.memberships.find_membership(workspace_id, email)? {
            if membership.is_active() {
                return Err(WorkspaceError::AlreadyMember(format!(
                    "{} is already a member of this workspace",
                    email
                )));
            }
        }

        let invitation = Invitation::new(
            workspace_id.clone(),
            inviter.clone(),
            email.to_string(),
            role,
            custom_message,
            expiration_days,
        );

        // A concurrent create may win the race; the constraint is authoritative
        match self.invitations.save(&invitation) {
            Ok(()) => {}
            Err(StorageError::ConstraintViolation(_)) => {
                return Err(WorkspaceError::Duplicate(format!(
                    "{} already has a pending invitation",
                    email
                )));
            }
            Err(e) => return Err(WorkspaceError::operation_failed("create_invitation", e)),
        }

        let delivered = self
            .notifier
            .send_invitation(InvitationDelivery {
                recipient_email: invitation.invited_email.clone(),
                token: invitation.token.as_str().to_string(),
                workspace_name: workspace.name.clone(),
                inviter_email: inviter,
                role,
                custom_message: invitation.custom_message.clone(),
            })
            .await;
        if !delivered {
            // Never rolls back the row; the invitation can be resent
            warn!(token = %invitation.token, "invitation email delivery failed");
        }

        info!(
            workspace_id = %workspace_id,
            invited_email = %invitation.invited_email,
            role = %role,
            delivered,
            "invitation created"
        );
        Ok(InvitationCreated {
            invitation,
            delivered,
        })
    }

    /// Accept an invitation by token, materializing the membership
    pub fn accept_invitation(&self, token: &InviteToken) -> WorkspaceResult<InvitationAccepted> {
        logged("accept_invitation", self.accept_inner(token))
    }

    fn accept_inner(&self, token: &InviteToken) -> WorkspaceResult<InvitationAccepted> {
        let mut invitation = self
            .invitations
            .find_by_token(token)
            .map_err(|e| WorkspaceError::operation_failed("accept_invitation", e))?
            .ok_or_else(|| WorkspaceError::NotFound("invitation not found".to_string()))?;

        if invitation.status != InvitationStatus::Pending {
            // Terminal rows stay terminal; if the target is meanwhile an
            // active member, report that instead of a bare state error.
            if self.is_active_member(&invitation)? {
                return Err(WorkspaceError::AlreadyMember(format!(
                    "{} is already a member of this workspace",
                    invitation.invited_email
                )));
            }
            return Err(WorkspaceError::Validation(format!(
                "invitation already processed (status {})",
                invitation.status.as_str()
            )));
        }

        let now = Timestamp::now();
        if invitation.is_expired(now) {
            invitation.mark_expired()?;
            self.save_invitation(&invitation, "accept_invitation")?;
            return Err(WorkspaceError::Expired(
                "this invitation has expired; ask for a new one".to_string(),
            ));
        }

        // Race with a concurrent accept or an administrative add: mark the
        // invitation accepted so the audit trail stays coherent, and report
        // the membership that already exists.
        if self.is_active_member(&invitation)? {
            invitation.mark_accepted(now)?;
            self.save_invitation(&invitation, "accept_invitation")?;
            return Err(WorkspaceError::AlreadyMember(format!(
                "{} is already a member of this workspace",
                invitation.invited_email
            )));
        }

        let workspace = self.find_workspace(&invitation.workspace_id)?;

        match self.memberships.materialize_from_invitation(
            invitation.workspace_id.clone(),
            invitation.invited_email.clone(),
            invitation.role,
        ) {
            Ok(_) => {}
            Err(err @ WorkspaceError::AlreadyMember(_)) => {
                // Lost the write race; same defensive marking as above
                invitation.mark_accepted(now)?;
                self.save_invitation(&invitation, "accept_invitation")?;
                return Err(err);
            }
            Err(e) => return Err(e),
        }

        invitation.mark_accepted(now)?;
        self.save_invitation(&invitation, "accept_invitation")?;

        info!(
            workspace_id = %invitation.workspace_id,
            invited_email = %invitation.invited_email,
            role = %invitation.role,
            "invitation accepted"
        );
        Ok(InvitationAccepted {
            workspace_id: invitation.workspace_id,
            workspace_name: workspace.name,
            invited_email: invitation.invited_email,
            role: invitation.role,
            invited_at: invitation.created_at,
            accepted_at: now,
        })
    }

    /// Withdraw a pending invitation; inviter or invitation manager only
    pub fn cancel_invitation(&self, token: &InviteToken) -> WorkspaceResult<Invitation> {
        logged("cancel_invitation", self.cancel_inner(token))
    }

    fn cancel_inner(&self, token: &InviteToken) -> WorkspaceResult<Invitation> {
        let mut invitation = self
            .invitations
            .find_by_token(token)
            .map_err(|e| WorkspaceError::operation_failed("cancel_invitation", e))?
            .ok_or_else(|| WorkspaceError::NotFound("invitation not found".to_string()))?;

        if invitation.status != InvitationStatus::Pending {
            return Err(WorkspaceError::Validation(format!(
                "invitation already processed (status {})",
                invitation.status.as_str()
            )));
        }

        let caller = self.memberships.authenticated_caller()?;
        let is_inviter = caller == invitation.invited_by_email;
        if !is_inviter
            && !self
                .memberships
                .can_invite_and_delete_users(&invitation.workspace_id, &caller)
        {
            return Err(WorkspaceError::Authorization(format!(
                "{} may not cancel this invitation",
                caller
            )));
        }

        invitation.mark_cancelled()?;
        self.save_invitation(&invitation, "cancel_invitation")?;

        info!(token = %invitation.token, "invitation cancelled");
        Ok(invitation)
    }

    /// Re-deliver a pending, unexpired invitation without touching its
    /// token or expiry
    pub async fn resend_invitation(&self, token: &InviteToken) -> WorkspaceResult<bool> {
        logged("resend_invitation", self.resend_inner(token).await)
    }

    async fn resend_inner(&self, token: &InviteToken) -> WorkspaceResult<bool> {
        let mut invitation = self
            .invitations
            .find_by_token(token)
            .map_err(|e| WorkspaceError::operation_failed("resend_invitation", e))?
            .ok_or_else(|| WorkspaceError::NotFound("invitation not found".to_string()))?;

        if invitation.status != InvitationStatus::Pending {
            return Err(WorkspaceError::Validation(format!(
                "invitation already processed (status {})",
                invitation.status.as_str()
            )));
        }

        if invitation.is_expired(Timestamp::now()) {
            invitation.mark_expired()?;
            self.save_invitation(&invitation, "resend_invitation")?;
            return Err(WorkspaceError::Expired(
                "this invitation has expired; ask for a new one".to_string(),
            ));
        }

        let caller = self.memberships.authenticated_caller()?;
        let is_inviter = caller == invitation.invited_by_email;
        if !is_inviter
            && !self
                .memberships
                .can_invite_and_delete_users(&invitation.workspace_id, &caller)
        {
            return Err(WorkspaceError::Authorization(format!(
                "{} may not resend this invitation",
                caller
            )));
        }

        let workspace = self.find_workspace(&invitation.workspace_id)?;
        let delivered = self
            .notifier
            .send_invitation(InvitationDelivery {
                recipient_email: invitation.invited_email.clone(),
                token: invitation.token.as_str().to_string(),
                workspace_name: workspace.name,
                inviter_email: invitation.invited_by_email.clone(),
                role: invitation.role,
                custom_message: invitation.custom_message.clone(),
            })
            .await;

        if !delivered {
            warn!(token = %invitation.token, "invitation email re-delivery failed");
        }
        Ok(delivered)
    }

    /// Pending invitations for a workspace; requires the invite capability
    pub fn list_pending(&self, workspace_id: &WorkspaceId) -> WorkspaceResult<Vec<Invitation>> {
        logged("list_pending", self.list_pending_inner(workspace_id))
    }

    fn list_pending_inner(&self, workspace_id: &WorkspaceId) -> WorkspaceResult<Vec<Invitation>> {
        let caller = self.memberships.authenticated_caller()?;
        if !self.memberships.can_invite_and_delete_users(workspace_id, &caller) {
            return Err(WorkspaceError::Authorization(format!(
                "{} may not list invitations for this workspace",
                caller
            )));
        }

        self.invitations
            .list_pending_for_workspace(workspace_id)
            .map_err(|e| WorkspaceError::operation_failed("list_pending", e))
    }

    fn is_active_member(&self, invitation: &Invitation) -> WorkspaceResult<bool> {
        Ok(self
            .memberships
            .find_membership(&invitation.workspace_id, &invitation.invited_email)?
            .map(|m| m.is_active())
            .unwrap_or(false))
    }

    fn find_workspace(&self, workspace_id: &WorkspaceId) -> WorkspaceResult<Workspace> {
        self.workspaces
            .find(workspace_id)
            .map_err(|e| WorkspaceError::operation_failed("find_workspace", e))?
            .ok_or_else(|| {
                WorkspaceError::NotFound(format!("workspace {} does not exist", workspace_id))
            })
    }

    fn save_invitation(
        &self,
        invitation: &Invitation,
        operation: &'static str,
    ) -> WorkspaceResult<()> {
        self.invitations
            .save(invitation)
            .map_err(|e| WorkspaceError::operation_failed(operation, e))
    }
}

/// Log at the operation boundary, once, at the tier the error calls for
fn logged<T>(operation: &str, result: WorkspaceResult<T>) -> WorkspaceResult<T> {
    if let Err(e) = &result {
        e.log(operation);
    }
    result
}
