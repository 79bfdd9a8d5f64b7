//! Database migrations for the workspace schema
//!
//! Versioned migrations applied atomically and tracked in the
//! workspace_schema_version table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version for core_workspace
pub const CURRENT_WORKSPACE_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial workspaces, memberships, and invitations schema",
        up_sql: r#"
            -- Schema version tracking for core_workspace
            CREATE TABLE IF NOT EXISTS workspace_schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workspaces (
                id TEXT PRIMARY KEY,                    -- WorkspaceId (UUID)
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Memberships: one row per (workspace, account)
            CREATE TABLE IF NOT EXISTS memberships (
                id TEXT PRIMARY KEY,                    -- MembershipId (UUID)
                workspace_id TEXT NOT NULL,
                account_email TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('Owner', 'Admin', 'Member', 'Guest')),
                status TEXT NOT NULL CHECK(status IN ('Active', 'Invited', 'Suspended')),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (workspace_id, account_email),
                FOREIGN KEY (workspace_id) REFERENCES workspaces(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_memberships_email ON memberships(account_email);

            -- Invitations: append-only audit trail, never deleted
            CREATE TABLE IF NOT EXISTS invitations (
                token TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                invited_by_email TEXT NOT NULL,
                invited_email TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('Owner', 'Admin', 'Member', 'Guest')),
                status TEXT NOT NULL CHECK(status IN ('Pending', 'Accepted', 'Expired', 'Cancelled')),
                custom_message TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                accepted_at INTEGER,
                FOREIGN KEY (workspace_id) REFERENCES workspaces(id)
            );

            CREATE INDEX IF NOT EXISTS idx_invitations_workspace ON invitations(workspace_id);

            -- At most one Pending invitation per (email, workspace)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_invitations_unique_pending
                ON invitations(invited_email, workspace_id)
                WHERE status = 'Pending';
        "#,
    }]
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> Result<i32, rusqlite::Error> {
    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {}", e),
        )))
    })?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS workspace_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM workspace_schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> Result<(), rusqlite::Error> {
    let current_version = get_current_version(pool)?;
    let migrations = get_migrations();

    let pending: Vec<_> = migrations
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {}", e),
        )))
    })?;

    for migration in pending {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as i64;

        tx.execute(
            "INSERT INTO workspace_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_pool() -> Pool<SqliteConnectionManager> {
        let manager = SqliteConnectionManager::memory();
        Pool::new(manager).expect("Failed to create pool")
    }

    #[test]
    fn test_initial_migration() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let conn = pool.get().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"workspaces".to_string()));
        assert!(tables.contains(&"memberships".to_string()));
        assert!(tables.contains(&"invitations".to_string()));
    }

    #[test]
    fn test_migration_version_tracking() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_WORKSPACE_SCHEMA_VERSION);
    }

    #[test]
    fn test_idempotent_migrations() {
        let pool = setup_test_pool();

        migrate(&pool).expect("First migration failed");
        migrate(&pool).expect("Second migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_WORKSPACE_SCHEMA_VERSION);
    }

    #[test]
    fn test_membership_uniqueness_constraint() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let conn = pool.get().unwrap();
        let now = 1000i64;

        conn.execute(
            "INSERT INTO workspaces (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            params!["ws1", "Test", now, now],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO memberships (id, workspace_id, account_email, role, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params!["m1", "ws1", "a@x.com", "Member", "Active", now, now],
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO memberships (id, workspace_id, account_email, role, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params!["m2", "ws1", "a@x.com", "Guest", "Active", now, now],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_single_pending_invitation_constraint() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let conn = pool.get().unwrap();
        let now = 1000i64;

        conn.execute(
            "INSERT INTO workspaces (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            params!["ws1", "Test", now, now],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO invitations (token, workspace_id, invited_by_email, invited_email, role, status, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params!["T1", "ws1", "o@x.com", "a@x.com", "Member", "Pending", now, now + 1],
        )
        .unwrap();

        // Second Pending row for the same (email, workspace) must fail
        let duplicate = conn.execute(
            "INSERT INTO invitations (token, workspace_id, invited_by_email, invited_email, role, status, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params!["T2", "ws1", "o@x.com", "a@x.com", "Member", "Pending", now, now + 1],
        );
        assert!(duplicate.is_err());

        // A terminal row for the same pair is fine
        conn.execute(
            "INSERT INTO invitations (token, workspace_id, invited_by_email, invited_email, role, status, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params!["T3", "ws1", "o@x.com", "a@x.com", "Member", "Expired", now, now + 1],
        )
        .unwrap();
    }
}
