//! SQL-based storage implementation for the workspace domain

use super::super::invitation::{Invitation, InvitationStatus};
use super::super::membership::{Membership, MembershipStatus};
use super::super::role::Role;
use super::super::types::{InviteToken, MembershipId, Timestamp, WorkspaceId};
use super::super::workspace::Workspace;
use super::{InvitationStore, MembershipStore, StorageError, StorageResult, WorkspaceStore};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};

/// SQL-based storage backing all three store traits
pub struct WorkspaceSqlStore {
    pool: Pool<SqliteConnectionManager>,
}

impl WorkspaceSqlStore {
    /// Create a new SQL store with the given connection pool
    pub fn new(pool: Pool<SqliteConnectionManager>) -> StorageResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open a file-backed store at the given path
    pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager).map_err(|e| StorageError::Pool(e.to_string()))?;
        Self::new(pool)
    }

    /// Create a new in-memory store (for testing)
    pub fn memory() -> StorageResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::new(manager).map_err(|e| StorageError::Pool(e.to_string()))?;
        Self::new(pool)
    }

    fn conn(&self) -> StorageResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| StorageError::Pool(e.to_string()))
    }

    fn map_sql_err(e: rusqlite::Error) -> StorageError {
        if let rusqlite::Error::SqliteFailure(err, ref msg) = e {
            if err.code == rusqlite::ErrorCode::ConstraintViolation {
                return StorageError::ConstraintViolation(
                    msg.clone().unwrap_or_else(|| "constraint violation".to_string()),
                );
            }
        }
        StorageError::Sql(e)
    }

    fn row_to_workspace(row: &Row<'_>) -> rusqlite::Result<Workspace> {
        Ok(Workspace {
            id: WorkspaceId::new(row.get(0)?),
            name: row.get(1)?,
            created_at: Timestamp::from_millis(row.get::<_, i64>(2)?.max(0) as u64),
            updated_at: Timestamp::from_millis(row.get::<_, i64>(3)?.max(0) as u64),
        })
    }

}

impl WorkspaceStore for WorkspaceSqlStore {
    fn find(&self, workspace_id: &WorkspaceId) -> StorageResult<Option<Workspace>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at, updated_at FROM workspaces WHERE id = ?",
            params![workspace_id.0],
            Self::row_to_workspace,
        )
        .optional()
        .map_err(Self::map_sql_err)
    }

    fn save(&self, workspace: &Workspace) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO workspaces (id, name, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at",
            params![
                workspace.id.0,
                &workspace.name,
                workspace.created_at.as_millis() as i64,
                workspace.updated_at.as_millis() as i64,
            ],
        )
        .map_err(Self::map_sql_err)?;
        Ok(())
    }

    fn delete(&self, workspace_id: &WorkspaceId) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM workspaces WHERE id = ?",
            params![workspace_id.0],
        )
        .map_err(Self::map_sql_err)?;
        Ok(())
    }
}

impl MembershipStore for WorkspaceSqlStore {
    fn find(&self, workspace_id: &WorkspaceId, email: &str) -> StorageResult<Option<Membership>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, workspace_id, account_email, role, status, created_at, updated_at
                 FROM memberships WHERE workspace_id = ? AND account_email = ?",
                params![workspace_id.0, email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(Self::map_sql_err)?;

        match row {
            None => Ok(None),
            Some((id, ws, email, role_str, status_str, created, updated)) => {
                let role = Role::parse(&role_str)
                    .ok_or_else(|| StorageError::Corrupt(format!("unknown role '{}'", role_str)))?;
                let status = MembershipStatus::parse(&status_str).ok_or_else(|| {
                    StorageError::Corrupt(format!("unknown status '{}'", status_str))
                })?;
                Ok(Some(Membership {
                    id: MembershipId::new(id),
                    workspace_id: WorkspaceId::new(ws),
                    account_email: email,
                    role,
                    status,
                    created_at: Timestamp::from_millis(created.max(0) as u64),
                    updated_at: Timestamp::from_millis(updated.max(0) as u64),
                }))
            }
        }
    }

    fn save(&self, membership: &Membership) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO memberships (id, workspace_id, account_email, role, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 role = excluded.role,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![
                membership.id.0,
                membership.workspace_id.0,
                &membership.account_email,
                membership.role.as_str(),
                membership.status.as_str(),
                membership.created_at.as_millis() as i64,
                membership.updated_at.as_millis() as i64,
            ],
        )
        .map_err(Self::map_sql_err)?;
        Ok(())
    }

    fn delete_all_for_workspace(&self, workspace_id: &WorkspaceId) -> StorageResult<usize> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM memberships WHERE workspace_id = ?",
            params![workspace_id.0],
        )
        .map_err(Self::map_sql_err)
    }
}

impl InvitationStore for WorkspaceSqlStore {
    fn find_by_token(&self, token: &InviteToken) -> StorageResult<Option<Invitation>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT token, workspace_id, invited_by_email, invited_email, role, status,
                        custom_message, created_at, expires_at, accepted_at
                 FROM invitations WHERE token = ?",
                params![token.0],
                invitation_columns,
            )
            .optional()
            .map_err(Self::map_sql_err)?;

        row.map(columns_to_invitation).transpose()
    }

    fn find_pending(
        &self,
        email: &str,
        workspace_id: &WorkspaceId,
    ) -> StorageResult<Option<Invitation>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT token, workspace_id, invited_by_email, invited_email, role, status,
                        custom_message, created_at, expires_at, accepted_at
                 FROM invitations
                 WHERE invited_email = ? AND workspace_id = ? AND status = 'Pending'",
                params![email, workspace_id.0],
                invitation_columns,
            )
            .optional()
            .map_err(Self::map_sql_err)?;

        row.map(columns_to_invitation).transpose()
    }

    fn list_pending_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> StorageResult<Vec<Invitation>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT token, workspace_id, invited_by_email, invited_email, role, status,
                        custom_message, created_at, expires_at, accepted_at
                 FROM invitations
                 WHERE workspace_id = ? AND status = 'Pending'
                 ORDER BY created_at",
            )
            .map_err(Self::map_sql_err)?;

        let rows = stmt
            .query_map(params![workspace_id.0], invitation_columns)
            .map_err(Self::map_sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::map_sql_err)?;

        rows.into_iter().map(columns_to_invitation).collect()
    }

    fn save(&self, invitation: &Invitation) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO invitations (token, workspace_id, invited_by_email, invited_email,
                                      role, status, custom_message, created_at, expires_at, accepted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(token) DO UPDATE SET
                 status = excluded.status,
                 accepted_at = excluded.accepted_at",
            params![
                invitation.token.0,
                invitation.workspace_id.0,
                &invitation.invited_by_email,
                &invitation.invited_email,
                invitation.role.as_str(),
                invitation.status.as_str(),
                &invitation.custom_message,
                invitation.created_at.as_millis() as i64,
                invitation.expires_at.as_millis() as i64,
                invitation.accepted_at.map(|t| t.as_millis() as i64),
            ],
        )
        .map_err(Self::map_sql_err)?;
        Ok(())
    }
}

type InvitationColumns = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
    i64,
    Option<i64>,
);

fn invitation_columns(row: &Row<'_>) -> rusqlite::Result<InvitationColumns> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn columns_to_invitation(cols: InvitationColumns) -> StorageResult<Invitation> {
    let (token, ws, by, email, role_str, status_str, message, created, expires, accepted) = cols;

    let role = Role::parse(&role_str)
        .ok_or_else(|| StorageError::Corrupt(format!("unknown role '{}'", role_str)))?;
    let status = InvitationStatus::parse(&status_str)
        .ok_or_else(|| StorageError::Corrupt(format!("unknown status '{}'", status_str)))?;

    Ok(Invitation {
        token: InviteToken::new(token),
        workspace_id: WorkspaceId::new(ws),
        invited_by_email: by,
        invited_email: email,
        role,
        status,
        custom_message: message,
        created_at: Timestamp::from_millis(created.max(0) as u64),
        expires_at: Timestamp::from_millis(expires.max(0) as u64),
        accepted_at: accepted.map(|t| Timestamp::from_millis(t.max(0) as u64)),
    })
}
