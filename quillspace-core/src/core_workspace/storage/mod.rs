//! Persistence abstractions for the workspace domain
//!
//! The services only see these traits. Implementations must provide atomic
//! check-and-insert semantics for the two uniqueness constraints: one
//! membership per (workspace, email), and one Pending invitation per
//! (email, workspace). A constraint failure surfaces as
//! [`StorageError::ConstraintViolation`] so the services can classify it as
//! the authoritative duplicate outcome.

pub mod migrations;
pub mod sql_store;

pub use sql_store::WorkspaceSqlStore;

use super::invitation::Invitation;
use super::membership::Membership;
use super::types::{InviteToken, WorkspaceId};
use super::workspace::Workspace;
use thiserror::Error;

/// Infrastructure faults raised by a store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to acquire a database connection: {0}")]
    Pool(String),

    #[error("database operation failed: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("uniqueness constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Workspace rows
pub trait WorkspaceStore: Send + Sync {
    fn find(&self, workspace_id: &WorkspaceId) -> StorageResult<Option<Workspace>>;
    fn save(&self, workspace: &Workspace) -> StorageResult<()>;
    fn delete(&self, workspace_id: &WorkspaceId) -> StorageResult<()>;
}

/// Membership rows; unique per (workspace, email)
pub trait MembershipStore: Send + Sync {
    fn find(&self, workspace_id: &WorkspaceId, email: &str) -> StorageResult<Option<Membership>>;
    fn save(&self, membership: &Membership) -> StorageResult<()>;
    fn delete_all_for_workspace(&self, workspace_id: &WorkspaceId) -> StorageResult<usize>;
}

/// Invitation rows; append-only, at most one Pending per (email, workspace)
pub trait InvitationStore: Send + Sync {
    fn find_by_token(&self, token: &InviteToken) -> StorageResult<Option<Invitation>>;
    fn find_pending(
        &self,
        email: &str,
        workspace_id: &WorkspaceId,
    ) -> StorageResult<Option<Invitation>>;
    fn list_pending_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> StorageResult<Vec<Invitation>>;
    fn save(&self, invitation: &Invitation) -> StorageResult<()>;
}
