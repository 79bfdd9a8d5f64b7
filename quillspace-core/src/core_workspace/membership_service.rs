//! Membership service: workspace creation, membership rows, and the
//! capability queries used as route guards
//!
//! Capability queries are total: absence of a row, a non-Active status, or
//! a storage fault all resolve to "no permission". A failed check never
//! silently grants access.

use super::collaborators::CallerContext;
use super::error::{WorkspaceError, WorkspaceResult};
use super::membership::{Membership, MembershipStatus};
use super::role::{Capabilities, Role};
use super::storage::{MembershipStore, StorageError, WorkspaceStore};
use super::types::{Timestamp, WorkspaceId};
use super::workspace::Workspace;
use std::sync::Arc;
use tracing::{info, warn};

/// Minimal syntactic email validation: one '@' with non-empty sides, no
/// whitespace, bounded length.
pub(crate) fn validate_email(email: &str) -> WorkspaceResult<()> {
    if email.is_empty() || email.len() > 255 {
        return Err(WorkspaceError::Validation(
            "email must be between 1 and 255 characters".to_string(),
        ));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(WorkspaceError::Validation(
            "email must not contain whitespace".to_string(),
        ));
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() {
        return Err(WorkspaceError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(())
}

/// Service for membership rows and capability answers
pub struct MembershipService {
    memberships: Arc<dyn MembershipStore>,
    workspaces: Arc<dyn WorkspaceStore>,
    caller: Arc<dyn CallerContext>,
}

impl MembershipService {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        workspaces: Arc<dyn WorkspaceStore>,
        caller: Arc<dyn CallerContext>,
    ) -> Self {
        Self {
            memberships,
            workspaces,
            caller,
        }
    }

    /// Create a workspace together with its Owner membership
    ///
    /// This is the only path that produces an Owner row.
    pub fn create_workspace(
        &self,
        name: String,
        owner_email: String,
    ) -> WorkspaceResult<(Workspace, Membership)> {
        if name.trim().is_empty() {
            return Err(WorkspaceError::Validation(
                "workspace name must not be empty".to_string(),
            ));
        }
        if name.len() > 100 {
            return Err(WorkspaceError::Validation(
                "workspace name must be at most 100 characters".to_string(),
            ));
        }
        validate_email(&owner_email)?;

        let workspace = Workspace::new(name);
        let owner = Membership::owner(workspace.id.clone(), owner_email);

        self.workspaces
            .save(&workspace)
            .map_err(|e| WorkspaceError::operation_failed("create_workspace", e))?;
        self.memberships
            .save(&owner)
            .map_err(|e| WorkspaceError::operation_failed("create_workspace", e))?;

        info!(workspace_id = %workspace.id, "workspace created");
        Ok((workspace, owner))
    }

    /// Look up the unique membership for (workspace, email)
    pub fn find_membership(
        &self,
        workspace_id: &WorkspaceId,
        email: &str,
    ) -> WorkspaceResult<Option<Membership>> {
        self.memberships
            .find(workspace_id, email)
            .map_err(|e| WorkspaceError::operation_failed("find_membership", e))
    }

    /// Materialize the Active membership for an accepted invitation
    ///
    /// A uniqueness violation at write time means a concurrent path created
    /// the row first and is reported as ALREADY_MEMBER.
    pub fn materialize_from_invitation(
        &self,
        workspace_id: WorkspaceId,
        email: String,
        role: Role,
    ) -> WorkspaceResult<Membership> {
        let membership =
            Membership::materialize(workspace_id, email, role, MembershipStatus::Active)?;

        match self.memberships.save(&membership) {
            Ok(()) => Ok(membership),
            Err(StorageError::ConstraintViolation(_)) => Err(WorkspaceError::AlreadyMember(
                format!("{} already belongs to this workspace", membership.account_email),
            )),
            Err(e) => Err(WorkspaceError::operation_failed(
                "materialize_from_invitation",
                e,
            )),
        }
    }

    /// Change a member's role; requires can_manage_workspace
    ///
    /// Owner rows cannot be touched and Owner cannot be granted here.
    pub fn change_role(
        &self,
        workspace_id: &WorkspaceId,
        target_email: &str,
        new_role: Role,
    ) -> WorkspaceResult<Membership> {
        self.require_capability(workspace_id, |c| c.can_manage_workspace)?;

        if new_role == Role::Owner {
            return Err(WorkspaceError::Validation(
                "ownership cannot be granted through a role change".to_string(),
            ));
        }

        let mut membership = self
            .find_membership(workspace_id, target_email)?
            .ok_or_else(|| {
                WorkspaceError::NotFound(format!("{} is not a member", target_email))
            })?;

        if membership.role == Role::Owner {
            return Err(WorkspaceError::Validation(
                "the owner's role cannot be changed".to_string(),
            ));
        }

        membership.role = new_role;
        membership.updated_at = Timestamp::now();
        self.memberships
            .save(&membership)
            .map_err(|e| WorkspaceError::operation_failed("change_role", e))?;
        Ok(membership)
    }

    /// Change a member's status; requires can_manage_workspace
    pub fn change_status(
        &self,
        workspace_id: &WorkspaceId,
        target_email: &str,
        new_status: MembershipStatus,
    ) -> WorkspaceResult<Membership> {
        self.require_capability(workspace_id, |c| c.can_manage_workspace)?;

        let mut membership = self
            .find_membership(workspace_id, target_email)?
            .ok_or_else(|| {
                WorkspaceError::NotFound(format!("{} is not a member", target_email))
            })?;

        if membership.role == Role::Owner {
            return Err(WorkspaceError::Validation(
                "the owner's membership cannot be suspended".to_string(),
            ));
        }

        membership.status = new_status;
        membership.updated_at = Timestamp::now();
        self.memberships
            .save(&membership)
            .map_err(|e| WorkspaceError::operation_failed("change_status", e))?;
        Ok(membership)
    }

    /// Delete a workspace and all of its membership rows; requires
    /// can_manage_workspace. Invitations are an audit trail and remain.
    pub fn delete_workspace(&self, workspace_id: &WorkspaceId) -> WorkspaceResult<()> {
        self.require_capability(workspace_id, |c| c.can_manage_workspace)?;

        self.memberships
            .delete_all_for_workspace(workspace_id)
            .map_err(|e| WorkspaceError::operation_failed("delete_workspace", e))?;
        self.workspaces
            .delete(workspace_id)
            .map_err(|e| WorkspaceError::operation_failed("delete_workspace", e))?;

        info!(workspace_id = %workspace_id, "workspace deleted");
        Ok(())
    }

    // ===== Capability queries =====

    /// Capability set for (email, workspace); fail-closed on any doubt
    pub fn capabilities_for(&self, workspace_id: &WorkspaceId, email: &str) -> Capabilities {
        match self.memberships.find(workspace_id, email) {
            Ok(Some(membership)) if membership.is_active() => membership.role.capabilities(),
            Ok(_) => Capabilities::none(),
            Err(e) => {
                warn!(
                    workspace_id = %workspace_id,
                    error = %e,
                    "capability lookup failed; answering fail-closed"
                );
                Capabilities::none()
            }
        }
    }

    pub fn can_manage_workspace(&self, workspace_id: &WorkspaceId, email: &str) -> bool {
        self.capabilities_for(workspace_id, email).can_manage_workspace
    }

    pub fn can_invite_and_delete_users(&self, workspace_id: &WorkspaceId, email: &str) -> bool {
        self.capabilities_for(workspace_id, email)
            .can_invite_and_delete_users
    }

    pub fn can_delete_page(&self, workspace_id: &WorkspaceId, email: &str) -> bool {
        self.capabilities_for(workspace_id, email).can_delete_page
    }

    pub fn can_edit_page(&self, workspace_id: &WorkspaceId, email: &str) -> bool {
        self.capabilities_for(workspace_id, email).can_edit_page
    }

    pub fn can_view_page(&self, workspace_id: &WorkspaceId, email: &str) -> bool {
        self.capabilities_for(workspace_id, email).can_view_page
    }

    /// Resolve the authenticated caller, or fail AUTHORIZATION
    pub(crate) fn authenticated_caller(&self) -> WorkspaceResult<String> {
        self.caller
            .current_email()
            .ok_or_else(|| WorkspaceError::Authorization("caller is not authenticated".to_string()))
    }

    fn require_capability(
        &self,
        workspace_id: &WorkspaceId,
        check: impl Fn(&Capabilities) -> bool,
    ) -> WorkspaceResult<String> {
        let caller = self.authenticated_caller()?;
        if !check(&self.capabilities_for(workspace_id, &caller)) {
            return Err(WorkspaceError::Authorization(format!(
                "{} is not allowed to perform this operation",
                caller
            )));
        }
        Ok(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_workspace::error::ErrorKind;
    use crate::core_workspace::storage::WorkspaceSqlStore;

    struct FixedCaller(Option<String>);

    impl CallerContext for FixedCaller {
        fn current_email(&self) -> Option<String> {
            self.0.clone()
        }
    }

    fn service_as(caller: Option<&str>) -> MembershipService {
        let store = Arc::new(WorkspaceSqlStore::memory().unwrap());
        MembershipService::new(
            store.clone(),
            store,
            Arc::new(FixedCaller(caller.map(String::from))),
        )
    }

    #[test]
    fn test_create_workspace_produces_owner() {
        let service = service_as(Some("alice@x.com"));
        let (ws, owner) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();

        assert_eq!(owner.role, Role::Owner);
        assert_eq!(owner.status, MembershipStatus::Active);

        let found = service.find_membership(&ws.id, "alice@x.com").unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_create_workspace_validates_input() {
        let service = service_as(Some("alice@x.com"));
        let err = service
            .create_workspace("  ".to_string(), "alice@x.com".to_string())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .create_workspace("Docs".to_string(), "not-an-email".to_string())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_capability_queries_fail_closed() {
        let service = service_as(Some("alice@x.com"));
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();

        // No membership row at all
        assert!(!service.can_view_page(&ws.id, "stranger@x.com"));
        assert!(!service.can_invite_and_delete_users(&ws.id, "stranger@x.com"));

        // Owner has everything
        assert!(service.can_manage_workspace(&ws.id, "alice@x.com"));
        assert!(service.can_invite_and_delete_users(&ws.id, "alice@x.com"));
    }

    #[test]
    fn test_suspended_member_has_no_capabilities() {
        let service = service_as(Some("alice@x.com"));
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();

        service
            .materialize_from_invitation(ws.id.clone(), "bob@x.com".to_string(), Role::Admin)
            .unwrap();
        assert!(service.can_invite_and_delete_users(&ws.id, "bob@x.com"));

        service
            .change_status(&ws.id, "bob@x.com", MembershipStatus::Suspended)
            .unwrap();
        assert!(!service.can_invite_and_delete_users(&ws.id, "bob@x.com"));
        assert!(!service.can_view_page(&ws.id, "bob@x.com"));
    }

    #[test]
    fn test_guest_cannot_invite_admin_can() {
        let service = service_as(Some("alice@x.com"));
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();

        service
            .materialize_from_invitation(ws.id.clone(), "guest@x.com".to_string(), Role::Guest)
            .unwrap();
        service
            .materialize_from_invitation(ws.id.clone(), "admin@x.com".to_string(), Role::Admin)
            .unwrap();

        assert!(!service.can_invite_and_delete_users(&ws.id, "guest@x.com"));
        assert!(service.can_invite_and_delete_users(&ws.id, "admin@x.com"));
    }

    #[test]
    fn test_materialize_duplicate_is_already_member() {
        let service = service_as(Some("alice@x.com"));
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();

        service
            .materialize_from_invitation(ws.id.clone(), "bob@x.com".to_string(), Role::Member)
            .unwrap();
        let err = service
            .materialize_from_invitation(ws.id.clone(), "bob@x.com".to_string(), Role::Member)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyMember);
    }

    #[test]
    fn test_change_role_requires_manage_capability() {
        let service = service_as(Some("bob@x.com"));
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();
        service
            .materialize_from_invitation(ws.id.clone(), "bob@x.com".to_string(), Role::Admin)
            .unwrap();

        // Admin manages members but not the workspace
        let err = service
            .change_role(&ws.id, "bob@x.com", Role::Member)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_change_role_never_emits_owner() {
        let service = service_as(Some("alice@x.com"));
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();
        service
            .materialize_from_invitation(ws.id.clone(), "bob@x.com".to_string(), Role::Member)
            .unwrap();

        let err = service
            .change_role(&ws.id, "bob@x.com", Role::Owner)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let changed = service.change_role(&ws.id, "bob@x.com", Role::Admin).unwrap();
        assert_eq!(changed.role, Role::Admin);
    }

    #[test]
    fn test_unauthenticated_caller_is_authorization_failure() {
        let service = service_as(None);
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();

        let err = service
            .change_role(&ws.id, "alice@x.com", Role::Member)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_delete_workspace_removes_memberships() {
        let service = service_as(Some("alice@x.com"));
        let (ws, _) = service
            .create_workspace("Docs".to_string(), "alice@x.com".to_string())
            .unwrap();
        service
            .materialize_from_invitation(ws.id.clone(), "bob@x.com".to_string(), Role::Member)
            .unwrap();

        service.delete_workspace(&ws.id).unwrap();
        assert!(service.find_membership(&ws.id, "bob@x.com").unwrap().is_none());
        assert!(service.find_membership(&ws.id, "alice@x.com").unwrap().is_none());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email(&format!("{}@x.com", "a".repeat(256))).is_err());
    }
}
