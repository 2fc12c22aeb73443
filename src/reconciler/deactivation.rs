//! Deactivation of target users that disappeared from the source or were
//! marked inactive. Runs strictly after user reconciliation so a user
//! matched by secondary email is never deactivated.

use std::collections::HashSet;

use tracing::{error, info};

use crate::domain::{SyncConfig, SyncError, TargetUser};
use crate::ports::{TargetApi, UserUpdate};
use crate::reconciler::users::TargetState;

pub fn deactivate_users(
    api: &dyn TargetApi,
    config: &SyncConfig,
    target_users: &[TargetUser],
    state: &TargetState,
    processed_user_ids: &HashSet<i64>,
    dry_run: bool,
) -> Result<(), SyncError> {
    if config.disable_user_deactivation {
        info!("Skipping user deactivation (deactivation is disabled)");
        return Ok(());
    }

    let prepared_emails: HashSet<&str> =
        target_users.iter().map(|user| user.email.as_str()).collect();
    let inactive_emails: HashSet<&str> = target_users
        .iter()
        .filter(|user| !user.is_active())
        .map(|user| user.email.as_str())
        .collect();

    let mut emails: Vec<&String> = state.users_by_email.keys().collect();
    emails.sort();

    for email in emails {
        let target_user = &state.users_by_email[email];
        let user_id = target_user.user_id;

        if config.ignored_user_ids.contains(&user_id) {
            continue;
        }
        if config.disable_manual_user_updates && state.is_manually_added(user_id) {
            info!("Skipping deactivation for manually added user: {email} (ID: {user_id})");
            continue;
        }
        if processed_user_ids.contains(&user_id) {
            continue;
        }
        if !target_user.is_enabled {
            continue;
        }

        let reason = if inactive_emails.contains(email.as_str()) {
            Some("marked as inactive")
        } else if !prepared_emails.contains(email.as_str()) {
            let secondary = state.additional_emails.get(&user_id).cloned().flatten();
            match secondary {
                Some(secondary) if prepared_emails.contains(secondary.to_lowercase().as_str()) => {
                    None
                }
                _ => Some("not present in source"),
            }
        } else {
            None
        };

        let Some(reason) = reason else {
            continue;
        };

        if dry_run {
            info!("[DRY RUN] Would deactivate user {email} ({reason})");
            if config.disabled_users_group_id != 0 {
                info!(
                    "[DRY RUN] Would move user {email} to disabled users group {}",
                    config.disabled_users_group_id
                );
            }
            continue;
        }

        info!("Deactivating user {email} ({reason})");
        if let Err(err) = api.update_user_setting(user_id, "disabled_user", "1") {
            error!("Failed to deactivate user {email}: {err}");
            continue;
        }

        if config.disabled_users_group_id != 0
            && target_user.group_id != Some(config.disabled_users_group_id)
        {
            info!(
                "Moving deactivated user {email} to group {}",
                config.disabled_users_group_id
            );
            let update =
                UserUpdate { group_id: Some(config.disabled_users_group_id), ..Default::default() };
            let current_group_id = target_user.group_id.unwrap_or(config.root_group_id);
            if let Err(err) = api.update_user(user_id, &update, current_group_id) {
                error!("Failed to move deactivated user {email}: {err}");
            }
        }
    }

    Ok(())
}
