//! Immutable run configuration loaded once from the process environment.

use std::collections::HashSet;
use std::env;

use crate::domain::SyncError;

/// Every knob driving the modeller and the reconciler.
///
/// Loaded once at start-up and passed by reference everywhere; nothing reads
/// the environment after construction.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_key: String,
    pub domain: String,
    pub root_group_id: i64,
    pub ignored_user_ids: HashSet<i64>,
    pub show_external_id: bool,
    pub skip_departments: String,
    pub use_supervisor_groups: bool,
    pub use_department_groups: bool,
    pub use_job_title_name_users: bool,
    pub use_job_title_name_groups: bool,
    pub replace_email_domain: String,
    pub use_is_supervisor_role: bool,
    pub exclude_regex: String,
    pub change_groups_regex: String,
    pub disable_new_users: bool,
    pub disable_user_deactivation: bool,
    pub disable_external_id_sync: bool,
    pub disable_additional_email_sync: bool,
    pub disable_manual_user_updates: bool,
    pub disable_group_updates: bool,
    pub disable_role_updates: bool,
    pub disable_groups_creation: bool,
    pub disabled_users_group_id: i64,
    pub prepare_transform_config: String,
    pub remove_empty_groups: bool,
    pub ssl_verify: bool,
}

impl SyncConfig {
    /// Load configuration for a reconcile run. API credentials are required.
    pub fn from_env() -> Result<Self, SyncError> {
        Self::load(true)
    }

    /// Load configuration for the offline prepare stage, which processes
    /// local data only and does not need API credentials.
    pub fn from_env_unauthenticated() -> Result<Self, SyncError> {
        Self::load(false)
    }

    fn load(validate_auth: bool) -> Result<Self, SyncError> {
        let api_key = env_string("TIMECAMP_API_KEY", "");
        if validate_auth && api_key.is_empty() {
            return Err(SyncError::config("Missing TIMECAMP_API_KEY environment variable"));
        }

        let root_group_id = match env::var("TIMECAMP_ROOT_GROUP_ID") {
            Ok(raw) => raw.trim().parse::<i64>().map_err(|_| {
                SyncError::config(format!("TIMECAMP_ROOT_GROUP_ID is not an integer: '{raw}'"))
            })?,
            Err(_) if validate_auth => {
                return Err(SyncError::config("Missing TIMECAMP_ROOT_GROUP_ID environment variable"));
            }
            Err(_) => 0,
        };

        Ok(Self {
            api_key,
            domain: env_string("TIMECAMP_DOMAIN", "app.timecamp.com"),
            root_group_id,
            ignored_user_ids: env_id_set("TIMECAMP_IGNORED_USER_IDS")?,
            show_external_id: env_bool("TIMECAMP_SHOW_EXTERNAL_ID", true),
            skip_departments: env_string("TIMECAMP_SKIP_DEPARTMENTS", ""),
            use_supervisor_groups: env_bool("TIMECAMP_USE_SUPERVISOR_GROUPS", false),
            use_department_groups: env_bool("TIMECAMP_USE_DEPARTMENT_GROUPS", true),
            use_job_title_name_users: env_bool("TIMECAMP_USE_JOB_TITLE_NAME_USERS", false),
            use_job_title_name_groups: env_bool("TIMECAMP_USE_JOB_TITLE_NAME_GROUPS", false),
            replace_email_domain: env_string("TIMECAMP_REPLACE_EMAIL_DOMAIN", ""),
            use_is_supervisor_role: env_bool("TIMECAMP_USE_IS_SUPERVISOR_ROLE", false),
            exclude_regex: env_string("TIMECAMP_EXCLUDE_REGEX", ""),
            change_groups_regex: env_string("TIMECAMP_CHANGE_GROUPS_REGEX", ""),
            disable_new_users: env_bool("TIMECAMP_DISABLE_NEW_USERS", false),
            disable_user_deactivation: env_bool("TIMECAMP_DISABLE_USER_DEACTIVATION", false),
            disable_external_id_sync: env_bool("TIMECAMP_DISABLE_EXTERNAL_ID_SYNC", false),
            disable_additional_email_sync: env_bool("TIMECAMP_DISABLE_ADDITIONAL_EMAIL_SYNC", false),
            disable_manual_user_updates: env_bool("TIMECAMP_DISABLE_MANUAL_USER_UPDATES", false),
            disable_group_updates: env_bool("TIMECAMP_DISABLE_GROUP_UPDATES", false),
            disable_role_updates: env_bool("TIMECAMP_DISABLE_ROLE_UPDATES", false),
            disable_groups_creation: env_bool("TIMECAMP_DISABLE_GROUPS_CREATION", false),
            disabled_users_group_id: env_i64("TIMECAMP_DISABLED_USERS_GROUP_ID", 0)?,
            prepare_transform_config: env_string("TIMECAMP_PREPARE_TRANSFORM_CONFIG", ""),
            remove_empty_groups: env_bool("TIMECAMP_REMOVE_EMPTY_GROUPS", false),
            ssl_verify: env_bool("TIMECAMP_SSL_VERIFY", true),
        })
    }
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).map(|v| v.trim().to_string()).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => value.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

fn env_i64(name: &str, default: i64) -> Result<i64, SyncError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| SyncError::config(format!("{name} is not an integer: '{raw}'"))),
        _ => Ok(default),
    }
}

fn env_id_set(name: &str) -> Result<HashSet<i64>, SyncError> {
    let raw = env_string(name, "");
    let mut ids = HashSet::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let id = token
            .parse::<i64>()
            .map_err(|_| SyncError::config(format!("{name} contains a non-integer id: '{token}'")))?;
        ids.insert(id);
    }
    Ok(ids)
}
