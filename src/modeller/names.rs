//! Display-name and group-label formatting.

use crate::domain::paths::clean_name;
use crate::domain::{RosterUser, SyncConfig};

/// Format a user's display name: optional `Job Title [Name]` wrapping and
/// optional ` - <external_id>` suffix, then API-safe scrubbing.
pub fn format_user_name(user: &RosterUser, config: &SyncConfig) -> String {
    let base = match user.job_title.as_deref().filter(|t| !t.is_empty()) {
        Some(title) if config.use_job_title_name_users => format!("{title} [{}]", user.name),
        _ => user.name.clone(),
    };
    with_external_id(base, user, config.show_external_id)
}

/// Format a supervisor's name for use as a group label.
///
/// Group labelling is configured independently of user naming, so this
/// recovers the bare name from an already-formatted `Title [Name]` string
/// before applying the group-side options.
pub fn format_group_name(user: &RosterUser, config: &SyncConfig) -> String {
    let mut base = user.name.clone();
    if base.ends_with(']')
        && let Some(bracket_pos) = base.rfind(" [")
        && bracket_pos > 0
    {
        base = base[bracket_pos + 2..base.len() - 1].to_string();
    }

    if config.use_job_title_name_groups
        && let Some(title) = user.job_title.as_deref().filter(|t| !t.is_empty())
    {
        base = format!("{title} [{base}]");
    }
    with_external_id(base, user, config.show_external_id)
}

fn with_external_id(base: String, user: &RosterUser, show_external_id: bool) -> String {
    if show_external_id && !user.external_id.is_empty() {
        clean_name(&format!("{base} - {}", user.external_id))
    } else {
        clean_name(&base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> SyncConfig {
        let mut config = crate::modeller::tests::base_config();
        config.show_external_id = false;
        config
    }

    fn user(name: &str, title: Option<&str>, external_id: &str) -> RosterUser {
        serde_json::from_value(json!({
            "external_id": external_id,
            "name": name,
            "email": "u@x",
            "job_title": title,
        }))
        .unwrap()
    }

    #[test]
    fn plain_name_is_scrubbed_and_trimmed() {
        let config = config();
        assert_eq!(format_user_name(&user(" Ann (HR) ", None, "9"), &config), "Ann HR");
    }

    #[test]
    fn job_title_wrapping_for_users() {
        let mut config = config();
        config.use_job_title_name_users = true;
        assert_eq!(format_user_name(&user("Ann", Some("Lead"), "9"), &config), "Lead [Ann]");
        assert_eq!(format_user_name(&user("Ann", Some(""), "9"), &config), "Ann");
    }

    #[test]
    fn external_id_suffix() {
        let mut config = config();
        config.show_external_id = true;
        assert_eq!(format_user_name(&user("Ann", None, "42"), &config), "Ann - 42");
        assert_eq!(format_user_name(&user("Ann", None, ""), &config), "Ann");
    }

    #[test]
    fn group_name_recovers_bare_name_from_formatted_input() {
        let mut config = config();
        config.use_job_title_name_groups = true;
        let formatted = user("Lead [Ann]", Some("Lead"), "9");
        assert_eq!(format_group_name(&formatted, &config), "Lead [Ann]");

        config.use_job_title_name_groups = false;
        assert_eq!(format_group_name(&formatted, &config), "Ann");
    }
}
