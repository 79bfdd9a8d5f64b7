//! Workspace entity

use super::types::{Timestamp, WorkspaceId};
use serde::{Deserialize, Serialize};

/// A Workspace is the top-level container members and pages belong to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique identifier
    pub id: WorkspaceId,

    /// Human-readable name
    pub name: String,

    /// When the workspace was created
    pub created_at: Timestamp,

    /// Last time workspace metadata was updated
    pub updated_at: Timestamp,
}

impl Workspace {
    /// Create a new Workspace
    pub fn new(name: String) -> Self {
        let now = Timestamp::now();
        Workspace {
            id: WorkspaceId::generate(),
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_workspace() {
        let ws = Workspace::new("Engineering".to_string());
        assert_eq!(ws.name, "Engineering");
        assert_eq!(ws.created_at, ws.updated_at);
    }

    #[test]
    fn test_workspace_ids_unique() {
        let a = Workspace::new("A".to_string());
        let b = Workspace::new("B".to_string());
        assert_ne!(a.id, b.id);
    }
}
