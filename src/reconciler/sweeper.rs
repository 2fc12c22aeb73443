//! Optional post-pass deleting leaf groups with no active users and no
//! children.

use std::collections::{HashMap, HashSet};

use tracing::{error, info};

use crate::domain::{SyncConfig, SyncError};
use crate::ports::{ApiGroup, TargetApi};

/// Absolute path per group id, used for depth ordering and log lines.
fn build_group_paths(groups: &[ApiGroup]) -> HashMap<i64, String> {
    let by_id: HashMap<i64, &ApiGroup> = groups.iter().map(|g| (g.group_id, g)).collect();
    let mut paths = HashMap::new();

    for group in groups {
        let mut parts = vec![group.name.trim().to_string()];
        let mut current = group;
        let mut seen = HashSet::from([group.group_id]);
        while let Some(parent_id) = current.parent_id.filter(|id| *id > 0) {
            match by_id.get(&parent_id) {
                Some(parent) if seen.insert(parent_id) => {
                    parts.push(parent.name.trim().to_string());
                    current = parent;
                }
                _ => break,
            }
        }
        parts.reverse();
        paths.insert(group.group_id, parts.join("/"));
    }

    paths
}

/// Delete every group that has neither active users nor child groups,
/// deepest first. Individual failures are logged and the sweep continues;
/// a parent emptied by this run is picked up by the next one.
pub fn remove_empty_groups(
    api: &dyn TargetApi,
    config: &SyncConfig,
    dry_run: bool,
) -> Result<(), SyncError> {
    info!("Fetching groups and users for the empty-group sweep...");
    let groups = api.groups()?;
    let users = api.users()?;
    info!("Found {} groups and {} users", groups.len(), users.len());

    let mut children: HashMap<i64, HashSet<i64>> = HashMap::new();
    for group in &groups {
        if let Some(parent_id) = group.parent_id.filter(|id| *id > 0) {
            children.entry(parent_id).or_default().insert(group.group_id);
        }
    }

    let mut active_members: HashMap<i64, usize> = HashMap::new();
    for user in &users {
        if !user.is_enabled {
            continue;
        }
        if let Some(group_id) = user.group_id {
            *active_members.entry(group_id).or_default() += 1;
        }
    }

    let paths = build_group_paths(&groups);
    let mut empty_groups: Vec<&ApiGroup> = groups
        .iter()
        .filter(|group| {
            group.group_id != config.root_group_id
                && !children.contains_key(&group.group_id)
                && !active_members.contains_key(&group.group_id)
        })
        .collect();

    if empty_groups.is_empty() {
        info!("No empty groups found");
        return Ok(());
    }

    // Deepest first, so children disappear before their parents.
    empty_groups.sort_by_key(|group| {
        let path = paths.get(&group.group_id).map(String::as_str).unwrap_or("");
        (std::cmp::Reverse(path.matches('/').count()), path.to_string())
    });

    info!("Found {} empty groups", empty_groups.len());

    for group in &empty_groups {
        let group_id = group.group_id;
        let path = paths.get(&group_id).map(String::as_str).unwrap_or(group.name.as_str());

        if dry_run {
            info!("[DRY RUN] Would delete empty group: {path} (ID: {group_id})");
            continue;
        }

        info!("Deleting empty group: {path} (ID: {group_id})");
        if let Err(err) = api.delete_group(group_id) {
            error!("Failed to delete group {path} (ID: {group_id}): {err}");
        }
    }

    if dry_run {
        info!("[DRY RUN] Would have deleted {} empty groups", empty_groups.len());
    } else {
        info!("Completed. Attempted to delete {} empty groups", empty_groups.len());
    }
    Ok(())
}
