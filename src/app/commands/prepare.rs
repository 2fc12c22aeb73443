//! `prepare` — Stage A: model the roster into the Target Document.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::domain::transform::{apply_transform, load_transform_config};
use crate::domain::{Roster, SyncConfig, SyncError};
use crate::modeller::prepare_target_users;
use crate::ports::BlobStore;

const ROSTER_FILE: &str = "var/users.json";

pub fn run(store: &dyn BlobStore, output: &str, dry_run: bool) -> Result<(), SyncError> {
    let config = SyncConfig::from_env_unauthenticated()?;
    info!("Loaded configuration from environment");
    log_configuration(&config);

    if !store.exists(ROSTER_FILE)? {
        return Err(SyncError::config(format!(
            "{ROSTER_FILE} not found. Run an extractor first."
        )));
    }
    info!("Reading source data from: {ROSTER_FILE}");
    let mut raw = store.load_json(ROSTER_FILE)?;

    if let Some(transform) = load_transform_config(&config.prepare_transform_config)?
        && let Some(users) = raw.get("users")
    {
        let (transformed, changed) = apply_transform(users, Some(&transform));
        if changed {
            info!("Applied prepare transform rules to the roster");
        }
        raw["users"] = transformed;
    }

    let roster = Roster::from_json(raw)?;
    info!("Loaded {} users from source", roster.users.len());

    let target_users = prepare_target_users(&roster, &config)?;
    info!("Prepared {} users", target_users.len());

    let active_count = target_users.iter().filter(|user| user.is_active()).count();
    info!("Active users: {active_count}, Inactive users: {}", target_users.len() - active_count);

    let mut role_counts: BTreeMap<String, usize> = BTreeMap::new();
    for user in &target_users {
        *role_counts.entry(format!("{:?}", user.role)).or_default() += 1;
    }
    for (role, count) in &role_counts {
        info!("{role} users: {count}");
    }

    let unique_groups: std::collections::HashSet<&str> = target_users
        .iter()
        .filter(|user| !user.groups_breadcrumb.is_empty())
        .map(|user| user.groups_breadcrumb.as_str())
        .collect();
    info!("Unique group paths: {}", unique_groups.len());

    let document = serde_json::to_value(&target_users)?;
    if dry_run {
        info!("[DRY RUN] Would write {} users to: {output}", target_users.len());
    } else {
        store.save_json(output, &document)?;
        info!("Successfully wrote Target Document to: {output}");
    }
    Ok(())
}

fn log_configuration(config: &SyncConfig) {
    match (config.use_supervisor_groups, config.use_department_groups) {
        (true, true) => info!("Grouping mode: HYBRID (departments with supervisor subgroups)"),
        (true, false) => info!("Grouping mode: SUPERVISOR-ONLY"),
        _ => info!("Grouping mode: DEPARTMENT-ONLY"),
    }
    debug!("show_external_id: {}", config.show_external_id);
    debug!("use_job_title_name_users: {}", config.use_job_title_name_users);
    debug!("use_job_title_name_groups: {}", config.use_job_title_name_groups);
    if !config.skip_departments.is_empty() {
        info!("Skipping department prefixes: '{}'", config.skip_departments);
    }
    if !config.replace_email_domain.is_empty() {
        info!("Replacing email domains with: '{}'", config.replace_email_domain);
    }
    if !config.exclude_regex.is_empty() {
        info!("Excluding users matching: '{}'", config.exclude_regex);
    }
    if !config.change_groups_regex.is_empty() {
        info!("Rewriting group paths with: '{}'", config.change_groups_regex);
    }
    if config.use_is_supervisor_role {
        info!("Deriving supervisor role from the is_supervisor flag");
    }
}
