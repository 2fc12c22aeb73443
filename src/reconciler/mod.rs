//! Stage B — the Target Reconciler.
//!
//! Stateful and network-bound: drives the target API until its state equals
//! the Target Document. All mutations are issued sequentially and are
//! idempotent at field granularity.

pub mod deactivation;
pub mod groups;
pub mod sweeper;
pub mod users;

use tracing::info;

use crate::domain::{SyncConfig, SyncError, TargetUser};
use crate::ports::TargetApi;

/// Run the full reconcile: groups, users, deactivations, finalisation and,
/// when configured, the empty-group sweep.
pub fn sync(
    api: &dyn TargetApi,
    config: &SyncConfig,
    target_users: &[TargetUser],
    dry_run: bool,
) -> Result<(), SyncError> {
    info!("Starting synchronization with {} users", target_users.len());

    info!("Synchronizing group structure...");
    let group_structure = groups::sync_groups(api, config, target_users, dry_run)?;

    info!("Synchronizing users...");
    let state = users::TargetState::fetch(api)?;
    let mut reconciler = users::UserReconciler::new(api, config, dry_run);
    let processed_user_ids = reconciler.reconcile(target_users, &group_structure, &state)?;

    deactivation::deactivate_users(api, config, target_users, &state, &processed_user_ids, dry_run)?;

    reconciler.finalize_new_users()?;

    if config.remove_empty_groups {
        sweeper::remove_empty_groups(api, config, dry_run)?;
    }

    info!("Synchronization completed successfully");
    Ok(())
}
