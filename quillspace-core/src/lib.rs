//! Quillspace core: collaborative workspace membership and invitations
//!
//! The heart of the crate is [`core_workspace`], which implements the
//! invitation lifecycle and the role-based capability model. [`config`] and
//! [`logging`] carry the ambient configuration and tracing setup.

pub mod config;
pub mod core_workspace;
pub mod logging;

pub use config::Config;
pub use core_workspace::{InvitationService, MembershipService, Role, WorkspaceError};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = Role::Member;
    }
}
