//! Stage A — the Organisation Modeller.
//!
//! Pure and offline: takes the raw roster plus the configuration profile and
//! produces the canonical, deterministically ordered Target Document.

pub mod names;
pub mod roles;
pub mod supervisor;

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::domain::paths::{GroupRenameRules, replace_email_domain};
use crate::domain::{Roster, RosterUser, SyncConfig, SyncError, TargetUser, UserStatus};

/// Model the roster into target-shaped user records.
///
/// Running this twice on the same input yields identical output: iteration
/// follows roster order and the emitted list is sorted by email.
pub fn prepare_target_users(
    roster: &Roster,
    config: &SyncConfig,
) -> Result<Vec<TargetUser>, SyncError> {
    let force_supervisor_exists = roles::force_supervisor_present(&roster.users);
    if force_supervisor_exists {
        info!("Detected forced supervisor roles in the roster - structural role derivation is disabled");
    }

    // Exclusion matches against the raw roster, before any reshaping.
    let excluded_emails = users_to_exclude(&roster.users, config);

    let mut users = roster.users.clone();
    for user in &mut users {
        user.name = names::format_user_name(user, config);
    }

    let index = supervisor::index_by_external_id(&users);
    match (config.use_supervisor_groups, config.use_department_groups) {
        (true, true) => {
            debug!("Using hybrid grouping: departments with supervisor subgroups");
            let supervisor_ids = supervisor::collect_supervisor_ids(&users);
            let paths = supervisor::build_supervisor_paths(&users, &index, &supervisor_ids, config);
            supervisor::assign_groups_hybrid(&mut users, &index, &supervisor_ids, &paths, config);
        }
        (true, false) => {
            debug!("Using supervisor-based grouping");
            let supervisor_ids = supervisor::collect_supervisor_ids(&users);
            let paths = supervisor::build_supervisor_paths(&users, &index, &supervisor_ids, config);
            supervisor::assign_groups_supervisor(&mut users, &index, &supervisor_ids, &paths, config);
        }
        (false, _) => {
            debug!("Using department-based grouping");
            supervisor::assign_groups_department(&mut users, config);
        }
    }

    // Later roster entries win on duplicate emails, then ordering is
    // re-established by the final sort.
    let mut by_email: HashMap<String, &RosterUser> = HashMap::new();
    for user in &users {
        if !user.external_id.is_empty() {
            by_email.insert(user.email.clone(), user);
        }
    }

    let rename_rules = GroupRenameRules::parse(&config.change_groups_regex);
    let mut target_users = Vec::with_capacity(by_email.len());

    for (email, user) in &by_email {
        if excluded_emails.contains(email) {
            debug!("Excluding user {email} (matched exclude regex)");
            continue;
        }

        let mut breadcrumb = user.department.clone();
        if !breadcrumb.is_empty() {
            breadcrumb = rename_rules.apply(&breadcrumb);
        }
        if user.force_global_admin_role {
            breadcrumb = String::new();
        }

        let status = if user.is_active() { UserStatus::Active } else { UserStatus::Inactive };
        let role = roles::determine_role(user, config, force_supervisor_exists);

        let real_email = user
            .real_email
            .as_deref()
            .filter(|real| !real.is_empty() && *real != email.as_str())
            .map(|real| replace_email_domain(real, &config.replace_email_domain));

        target_users.push(TargetUser {
            external_id: user.external_id.clone(),
            user_name: user.name.clone(),
            email: replace_email_domain(email, &config.replace_email_domain),
            real_email,
            groups_breadcrumb: breadcrumb,
            status,
            role,
            raw_data: serde_json::to_value(user)?,
        });
    }

    target_users.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(target_users)
}

/// Lower-cased emails of users matching the exclusion regex against the
/// synthesised `department="…" job_title="…" email="…"` context.
fn users_to_exclude(users: &[RosterUser], config: &SyncConfig) -> HashSet<String> {
    if config.exclude_regex.is_empty() {
        return HashSet::new();
    }

    info!("Filtering users with regex: {}", config.exclude_regex);
    let pattern = match Regex::new(&config.exclude_regex) {
        Ok(pattern) => pattern,
        Err(err) => {
            error!("Invalid exclude regex pattern: {err}");
            warn!("Regex filtering skipped due to invalid pattern");
            return HashSet::new();
        }
    };

    let mut excluded = HashSet::new();
    for user in users {
        let context = format!(
            r#"department="{}" job_title="{}" email="{}""#,
            unquote(&user.department),
            unquote(user.job_title.as_deref().unwrap_or("")),
            unquote(&user.email),
        );
        if pattern.is_match(&context) && !user.email.is_empty() {
            debug!("Marking user for exclusion: {}", user.email);
            excluded.insert(user.email.to_lowercase());
        }
    }

    info!("Marked {} users for exclusion", excluded.len());
    excluded
}

fn unquote(value: &str) -> String {
    value.replace('"', "'")
}
