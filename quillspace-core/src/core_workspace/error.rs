//! Workspace error taxonomy
//!
//! Two tiers by origin: business-rule violations are expected, correctable
//! by the caller, and logged at warn without a cause chain; infrastructure
//! faults are wrapped as [`WorkspaceError::OperationFailed`] with the
//! original cause attached and logged at error. A business failure is never
//! re-wrapped as generic, and a generic failure is never swallowed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Stable machine-readable failure kind surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Duplicate,
    Expired,
    AlreadyMember,
    OperationFailed,
}

/// Errors surfaced by the workspace services
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("expired: {0}")]
    Expired(String),

    #[error("already a member: {0}")]
    AlreadyMember(String),

    #[error("operation {operation} failed")]
    OperationFailed {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl WorkspaceError {
    /// Wrap an infrastructure fault, tagging the operation it interrupted
    pub fn operation_failed(
        operation: &'static str,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        WorkspaceError::OperationFailed {
            operation,
            source: source.into(),
        }
    }

    /// The machine-readable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkspaceError::Validation(_) => ErrorKind::Validation,
            WorkspaceError::Authorization(_) => ErrorKind::Authorization,
            WorkspaceError::NotFound(_) => ErrorKind::NotFound,
            WorkspaceError::Duplicate(_) => ErrorKind::Duplicate,
            WorkspaceError::Expired(_) => ErrorKind::Expired,
            WorkspaceError::AlreadyMember(_) => ErrorKind::AlreadyMember,
            WorkspaceError::OperationFailed { .. } => ErrorKind::OperationFailed,
        }
    }

    /// True for expected, caller-correctable failures
    pub fn is_business(&self) -> bool {
        self.kind() != ErrorKind::OperationFailed
    }

    /// Log at the level appropriate for this error's tier
    pub fn log(&self, operation: &str) {
        match self {
            WorkspaceError::OperationFailed { source, .. } => {
                error!(operation, cause = ?source, "operation failed");
            }
            business => {
                warn!(operation, kind = ?business.kind(), "{}", business);
            }
        }
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_kinds() {
        let err = WorkspaceError::Duplicate("pending invitation exists".to_string());
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert!(err.is_business());
    }

    #[test]
    fn test_operation_failed_carries_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = WorkspaceError::operation_failed("create_invitation", cause);
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert!(!err.is_business());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_kind_serializes_stably() {
        let kind = serde_json::to_string(&ErrorKind::AlreadyMember).unwrap();
        assert_eq!(kind, "\"AlreadyMember\"");
    }
}
