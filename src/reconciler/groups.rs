//! Group reconciliation: make the target's tree contain every path the
//! Target Document requires.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::domain::{SyncConfig, SyncError, TargetUser};
use crate::ports::{ApiGroup, TargetApi};

/// Breadcrumb-to-group-id map, relative to the configured root group.
///
/// Paths the reconciler could not resolve (creation disabled, or dry-run)
/// are present with no id so membership updates can tell "missing" from
/// "root".
#[derive(Debug, Default)]
pub struct GroupStructure {
    paths: HashMap<String, Option<i64>>,
}

impl GroupStructure {
    pub fn insert(&mut self, breadcrumb: String, group_id: Option<i64>) {
        self.paths.insert(breadcrumb, group_id);
    }

    /// The group id for a breadcrumb, when it exists on the target.
    pub fn resolve(&self, breadcrumb: &str) -> Option<i64> {
        self.paths.get(breadcrumb).copied().flatten()
    }
}

/// Every breadcrumb of an active user, plus all ancestor prefixes.
/// Inactive users' groups are deliberately left out so the sweeper can
/// remove them once empty.
pub fn required_group_paths(target_users: &[TargetUser]) -> HashSet<String> {
    let mut paths = HashSet::new();
    for user in target_users {
        if !user.is_active() || user.groups_breadcrumb.is_empty() {
            continue;
        }
        let parts: Vec<&str> = user.groups_breadcrumb.split('/').collect();
        for depth in 1..=parts.len() {
            paths.insert(parts[..depth].join("/"));
        }
    }
    paths
}

/// Walk parent chains to compute each group's path relative to the root
/// group. Groups outside the root's subtree are ignored.
fn paths_relative_to_root(groups: &[ApiGroup], root_group_id: i64) -> HashMap<String, i64> {
    let by_id: HashMap<i64, &ApiGroup> = groups.iter().map(|g| (g.group_id, g)).collect();
    let mut paths = HashMap::new();

    for group in groups {
        if group.group_id == root_group_id {
            continue;
        }
        let mut parts = vec![group.name.trim().to_string()];
        let mut current = group;
        let mut seen = HashSet::from([group.group_id]);
        loop {
            match current.parent_id {
                Some(parent_id) if parent_id == root_group_id => {
                    parts.reverse();
                    paths.insert(parts.join("/"), group.group_id);
                    break;
                }
                Some(parent_id) => match by_id.get(&parent_id) {
                    Some(parent) if seen.insert(parent_id) => {
                        parts.push(parent.name.trim().to_string());
                        current = parent;
                    }
                    _ => break,
                },
                None => break,
            }
        }
    }

    paths
}

/// Create every missing required group, strictly top-down by path depth,
/// reusing same-named siblings under the current parent.
pub fn sync_groups(
    api: &dyn TargetApi,
    config: &SyncConfig,
    target_users: &[TargetUser],
    dry_run: bool,
) -> Result<GroupStructure, SyncError> {
    let required = required_group_paths(target_users);
    info!("Found {} required group paths", required.len());

    let current_groups = api.groups()?;
    let mut structure = GroupStructure::default();
    for (path, group_id) in paths_relative_to_root(&current_groups, config.root_group_id) {
        structure.insert(path, Some(group_id));
    }

    let mut by_parent: HashMap<(i64, String), i64> = current_groups
        .iter()
        .filter_map(|group| {
            group.parent_id.map(|parent_id| {
                ((parent_id, group.name.trim().to_string()), group.group_id)
            })
        })
        .collect();

    let mut ordered: Vec<&String> = required.iter().collect();
    ordered.sort_by(|a, b| {
        a.split('/').count().cmp(&b.split('/').count()).then_with(|| a.cmp(b))
    });

    for full_path in ordered {
        if structure.paths.contains_key(full_path.as_str()) {
            continue;
        }

        let mut current_path = String::new();
        let mut parent_id = Some(config.root_group_id);

        for part in full_path.split('/').map(str::trim).filter(|part| !part.is_empty()) {
            if current_path.is_empty() {
                current_path = part.to_string();
            } else {
                current_path = format!("{current_path}/{part}");
            }

            if let Some(known) = structure.paths.get(&current_path) {
                parent_id = *known;
                continue;
            }

            let existing =
                parent_id.and_then(|pid| by_parent.get(&(pid, part.to_string())).copied());
            if let Some(group_id) = existing {
                structure.insert(current_path.clone(), Some(group_id));
                parent_id = Some(group_id);
                continue;
            }

            let parent_label =
                parent_id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string());
            if dry_run {
                info!("[DRY RUN] Would create group: {part} under parent {parent_label}");
                structure.insert(current_path.clone(), None);
                parent_id = None;
            } else if config.disable_groups_creation {
                info!(
                    "Skipping group creation: {part} under parent {parent_label} (groups creation is disabled)"
                );
                structure.insert(current_path.clone(), None);
                parent_id = None;
            } else if let Some(pid) = parent_id {
                info!("Creating group: {part} under parent {pid}");
                let group_id = api.add_group(part, pid)?;
                structure.insert(current_path.clone(), Some(group_id));
                by_parent.insert((pid, part.to_string()), group_id);
                parent_id = Some(group_id);
            } else {
                // The parent was skipped above, so the child cannot be
                // created either.
                debug!("Skipping group {part}: parent path was not created");
                structure.insert(current_path.clone(), None);
            }
        }
    }

    Ok(structure)
}
