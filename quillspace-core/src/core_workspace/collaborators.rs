//! Collaborator traits consumed by the workspace services
//!
//! These are the seams to subsystems owned elsewhere: the account registry,
//! the email transport, and the authenticated request context. The services
//! only ever see these traits.

use super::role::Role;
use async_trait::async_trait;

/// Registry of known accounts, keyed by email address
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Whether an account exists for this email
    async fn exists(&self, email: &str) -> anyhow::Result<bool>;
}

/// Everything the notification needs to render an invitation email
#[derive(Debug, Clone)]
pub struct InvitationDelivery {
    pub recipient_email: String,
    pub token: String,
    pub workspace_name: String,
    pub inviter_email: String,
    pub role: Role,
    pub custom_message: Option<String>,
}

/// Best-effort email delivery
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver an invitation email; returns whether delivery succeeded.
    ///
    /// Delivery failure never rolls back the invitation row; the row is the
    /// source of truth and the invitation can be resent.
    async fn send_invitation(&self, delivery: InvitationDelivery) -> bool;
}

/// Identity of the caller on whose behalf an operation runs
pub trait CallerContext: Send + Sync {
    /// Email of the authenticated caller, or None when unauthenticated
    fn current_email(&self) -> Option<String>;
}
