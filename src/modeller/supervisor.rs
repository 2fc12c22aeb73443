//! Group derivation: supervisor chains, department paths, and the hybrid
//! composition of both.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::paths::clean_department_path;
use crate::domain::{RosterUser, SyncConfig};
use crate::modeller::names::format_group_name;

/// Index from external id to roster position, for users that carry one.
pub fn index_by_external_id(users: &[RosterUser]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (position, user) in users.iter().enumerate() {
        if !user.external_id.is_empty() {
            index.insert(user.external_id.clone(), position);
        }
    }
    index
}

/// External ids referenced as somebody's supervisor, restricted to
/// identifiable users (the same restriction the path builder works under).
pub fn collect_supervisor_ids(users: &[RosterUser]) -> HashSet<String> {
    users
        .iter()
        .filter(|user| !user.external_id.is_empty() && user.has_supervisor())
        .map(|user| user.supervisor_id.trim().to_string())
        .collect()
}

/// External ids with at least one subordinate anywhere in the roster.
fn collect_ids_with_subordinates(users: &[RosterUser]) -> HashSet<String> {
    users
        .iter()
        .filter(|user| user.has_supervisor())
        .map(|user| user.supervisor_id.trim().to_string())
        .collect()
}

/// Build each supervisor's breadcrumb by walking their own supervisor chain
/// top-down to a fixed point.
///
/// Iteration follows roster order, so the result is deterministic. After the
/// fixed point, supervisors that are still unresolved (their own supervisor
/// is missing from the roster, or the chain is cyclic) are seeded as
/// top-level with a warning.
pub fn build_supervisor_paths(
    users: &[RosterUser],
    index: &HashMap<String, usize>,
    supervisor_ids: &HashSet<String>,
    config: &SyncConfig,
) -> HashMap<String, String> {
    let mut paths: HashMap<String, String> = HashMap::new();

    let supervisors_in_roster: Vec<&RosterUser> = users
        .iter()
        .filter(|user| supervisor_ids.contains(&user.external_id))
        .collect();

    for user in &supervisors_in_roster {
        if !user.has_supervisor() {
            paths.insert(user.external_id.clone(), format_group_name(user, config));
        }
    }

    loop {
        let mut more_to_process = true;
        while more_to_process {
            more_to_process = false;
            for user in &supervisors_in_roster {
                if paths.contains_key(&user.external_id) || !user.has_supervisor() {
                    continue;
                }
                if let Some(parent_path) = paths.get(user.supervisor_id.trim()) {
                    let own_name = format_group_name(user, config);
                    paths.insert(user.external_id.clone(), format!("{parent_path}/{own_name}"));
                    more_to_process = true;
                }
            }
        }

        // Seed the earliest still-unresolved supervisor as top-level and run
        // the fixed point again so their subtree resolves normally.
        let Some(unresolved) = supervisors_in_roster
            .iter()
            .find(|user| !paths.contains_key(&user.external_id))
        else {
            break;
        };
        let supervisor_id = unresolved.supervisor_id.trim();
        if index.contains_key(supervisor_id) {
            warn!(
                "Supervisor chain for '{}' is cyclic; treating them as top-level",
                unresolved.external_id
            );
        } else {
            warn!(
                "Supervisor '{supervisor_id}' of '{}' is not in the roster; treating '{}' as top-level",
                unresolved.external_id, unresolved.external_id
            );
        }
        paths.insert(unresolved.external_id.clone(), format_group_name(unresolved, config));
    }

    paths
}

/// Supervisor-only mode: everyone lands in their direct supervisor's group;
/// supervisors land in their own.
pub fn assign_groups_supervisor(
    users: &mut [RosterUser],
    index: &HashMap<String, usize>,
    supervisor_ids: &HashSet<String>,
    supervisor_paths: &HashMap<String, String>,
    config: &SyncConfig,
) {
    let with_subordinates = collect_ids_with_subordinates(users);
    let mut assignments: Vec<(usize, String)> = Vec::new();

    for (position, user) in users.iter().enumerate() {
        if user.external_id.is_empty() {
            continue;
        }
        let is_a_supervisor = supervisor_ids.contains(&user.external_id);

        let department = if is_a_supervisor {
            // Paths are total for supervisors after the fixed-point pass.
            supervisor_paths
                .get(&user.external_id)
                .map(|path| clean_department_path(path, &config.skip_departments))
        } else if user.has_supervisor() {
            let supervisor_id = user.supervisor_id.trim();
            match supervisor_paths.get(supervisor_id) {
                Some(path) => Some(clean_department_path(path, &config.skip_departments)),
                None => match index.get(supervisor_id).map(|pos| &users[*pos]) {
                    Some(supervisor) => Some(clean_department_path(
                        &format_group_name(supervisor, config),
                        &config.skip_departments,
                    )),
                    None => {
                        warn!(
                            "User '{}' references supervisor '{supervisor_id}' that is not in the roster; placing in root group",
                            user.external_id
                        );
                        Some(String::new())
                    }
                },
            }
        } else {
            debug!("User '{}' has no supervisor and no subordinates; placing in root group", user.external_id);
            Some(String::new())
        };

        if let Some(department) = department {
            assignments.push((position, department));
        }
    }

    for (position, department) in assignments {
        users[position].department = department;
    }
    apply_structural_roles(users, &with_subordinates);
}

/// Hybrid mode: the cleaned department path prefixes the supervisor's bare
/// name component. Users without a department fall back to supervisor-only
/// placement.
pub fn assign_groups_hybrid(
    users: &mut [RosterUser],
    index: &HashMap<String, usize>,
    supervisor_ids: &HashSet<String>,
    supervisor_paths: &HashMap<String, String>,
    config: &SyncConfig,
) {
    let with_subordinates = collect_ids_with_subordinates(users);
    let mut assignments: Vec<(usize, String)> = Vec::new();

    for (position, user) in users.iter().enumerate() {
        if user.external_id.is_empty() {
            continue;
        }
        let original_department = clean_department_path(&user.department, &config.skip_departments);
        let is_a_supervisor = supervisor_ids.contains(&user.external_id);
        let own_path = supervisor_paths.get(&user.external_id);

        let department = if !original_department.is_empty() {
            if is_a_supervisor && let Some(path) = own_path {
                // The supervisor's own name is the last path component.
                let own_name = path.rsplit('/').next().unwrap_or(path);
                format!("{original_department}/{own_name}")
            } else if user.has_supervisor() {
                let supervisor_id = user.supervisor_id.trim();
                match index.get(supervisor_id).map(|pos| &users[*pos]) {
                    Some(supervisor) => {
                        let supervisor_name = format_group_name(supervisor, config);
                        format!("{original_department}/{supervisor_name}")
                    }
                    None => {
                        debug!(
                            "Supervisor '{supervisor_id}' of '{}' not found; keeping department group",
                            user.external_id
                        );
                        original_department
                    }
                }
            } else {
                original_department
            }
        } else if is_a_supervisor && let Some(path) = own_path {
            path.clone()
        } else if user.has_supervisor() {
            let supervisor_id = user.supervisor_id.trim();
            match supervisor_paths.get(supervisor_id) {
                Some(path) => path.clone(),
                None => match index.get(supervisor_id).map(|pos| &users[*pos]) {
                    Some(supervisor) => format_group_name(supervisor, config),
                    None => {
                        warn!(
                            "User '{}' references supervisor '{supervisor_id}' that is not in the roster; placing in root group",
                            user.external_id
                        );
                        String::new()
                    }
                },
            }
        } else {
            String::new()
        };

        assignments.push((position, department));
    }

    for (position, department) in assignments {
        users[position].department = department;
    }
    apply_structural_roles(users, &with_subordinates);
}

/// Department-only mode: the breadcrumb is the cleaned department path.
pub fn assign_groups_department(users: &mut [RosterUser], config: &SyncConfig) {
    for user in users {
        if !user.department.is_empty() {
            user.department = clean_department_path(&user.department, &config.skip_departments);
        }
    }
}

/// Anyone appearing as another user's supervisor gets the supervisor role
/// id; everyone else identifiable gets the regular one.
fn apply_structural_roles(users: &mut [RosterUser], with_subordinates: &HashSet<String>) {
    for user in users {
        if user.external_id.is_empty() {
            continue;
        }
        user.role_id = Some(if with_subordinates.contains(&user.external_id) {
            "2".to_string()
        } else {
            "3".to_string()
        });
    }
}
