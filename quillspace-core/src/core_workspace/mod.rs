//! Workspace Membership & Invitations
//!
//! This module implements how an external identity becomes an authorized
//! workspace member: the role/capability model, the invitation lifecycle, and
//! the membership rows materialized from accepted invitations.
//!
//! ## Architecture
//!
//! - **Workspace**: Top-level container members and pages belong to
//! - **Membership**: One row per (workspace, account) with a role and status
//! - **Invitation**: Time-boxed, single-use offer of a role; append-only audit trail
//! - **Role**: Owner > Admin > Member > Guest, each mapped to a fixed capability set
//!
//! ## Key Design Principles
//!
//! 1. One capability table; callers never compare role tags directly
//! 2. Fail-closed authorization: missing or uncertain information grants nothing
//! 3. Forward-only invitation transitions with lazy expiry on every read path
//! 4. Store uniqueness constraints are the serialization points under races

pub mod collaborators;
pub mod error;
pub mod invitation;
pub mod invitation_service;
pub mod membership;
pub mod membership_service;
pub mod role;
pub mod storage;
pub mod types;
pub mod workspace;

pub use collaborators::{CallerContext, IdentityDirectory, InvitationDelivery, NotificationSender};
pub use error::{ErrorKind, WorkspaceError, WorkspaceResult};
pub use invitation::{Invitation, InvitationStatus, DEFAULT_EXPIRATION_DAYS};
pub use invitation_service::{InvitationAccepted, InvitationCreated, InvitationService};
pub use membership::{Membership, MembershipStatus};
pub use membership_service::MembershipService;
pub use role::{Capabilities, Role, ALL_ROLES};
pub use storage::{
    InvitationStore, MembershipStore, StorageError, WorkspaceSqlStore, WorkspaceStore,
};
pub use types::{InviteToken, MembershipId, Timestamp, WorkspaceId};
pub use workspace::Workspace;
