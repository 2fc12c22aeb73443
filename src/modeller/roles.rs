//! Role resolution for modelled users.

use crate::domain::{Role, RosterUser, SyncConfig};

/// Whether any roster user carries a forced supervisor role. One such user
/// switches every other user's structural supervisor derivation off, so a
/// partial supervisor list cannot demote or promote anyone by accident.
pub fn force_supervisor_present(users: &[RosterUser]) -> bool {
    users.iter().any(|user| user.force_supervisor_role)
}

/// Resolve the target role. Priority: forced admin, forced supervisor, the
/// forced-supervisor kill-switch, the `is_supervisor` flag (when configured),
/// then the structural/source `role_id`.
pub fn determine_role(
    user: &RosterUser,
    config: &SyncConfig,
    force_supervisor_exists: bool,
) -> Role {
    if user.force_global_admin_role {
        return Role::Administrator;
    }
    if user.force_supervisor_role {
        return Role::Supervisor;
    }
    if force_supervisor_exists {
        return Role::User;
    }

    if config.use_is_supervisor_role {
        return match user.is_supervisor.as_ref().and_then(|flag| flag.as_bool()) {
            Some(true) => Role::Supervisor,
            _ => Role::User,
        };
    }

    Role::from_role_id(user.role_id.as_deref().unwrap_or("3"))
}
