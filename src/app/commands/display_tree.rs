//! `display-tree` — render the Target Document as a group hierarchy.

use std::collections::BTreeMap;

use crate::domain::tree::{GroupTree, parse_display_name};
use crate::domain::{Role, SyncError, TargetUser};
use crate::ports::BlobStore;

const ROOT_LABEL: &str = "<root>";

pub fn run(store: &dyn BlobStore, file: &str, detailed: bool) -> Result<(), SyncError> {
    let document = store.load_json(file)?;
    let users: Vec<TargetUser> = serde_json::from_value(document)?;
    print!("{}", render(&users, detailed));
    Ok(())
}

/// Render the whole report; separated from `run` so tests can assert on it.
fn render(users: &[TargetUser], detailed: bool) -> String {
    let active: Vec<&TargetUser> = users.iter().filter(|user| user.is_active()).collect();
    let supervisor_count = active.iter().filter(|user| user.role == Role::Supervisor).count();
    let regular_count = active.iter().filter(|user| user.role == Role::User).count();

    let group_paths: Vec<&str> = active
        .iter()
        .filter(|user| !user.groups_breadcrumb.is_empty())
        .map(|user| user.groups_breadcrumb.as_str())
        .collect();

    let mut by_group: BTreeMap<&str, Vec<&TargetUser>> = BTreeMap::new();
    for user in &active {
        let key = if user.groups_breadcrumb.is_empty() {
            ROOT_LABEL
        } else {
            user.groups_breadcrumb.as_str()
        };
        by_group.entry(key).or_default().push(user);
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n", "=".repeat(80)));
    out.push_str("GROUP STRUCTURE\n");
    out.push_str(&format!("{}\n", "=".repeat(80)));

    out.push_str("\nSTATISTICS:\n");
    out.push_str(&format!("   - Total Active Users: {}\n", active.len()));
    out.push_str(&format!("   - Supervisors: {supervisor_count}\n"));
    out.push_str(&format!("   - Regular Users: {regular_count}\n"));
    out.push_str(&format!(
        "   - Total Groups: {}\n",
        group_paths.iter().collect::<std::collections::HashSet<_>>().len()
    ));

    out.push_str("\nGROUP HIERARCHY:\n");
    let tree = GroupTree::from_paths(group_paths.iter().copied());
    if tree.is_empty() {
        out.push_str("   (No group structure found - all users in root)\n");
    } else {
        out.push_str(&tree.render());
    }

    out.push_str("\nUSER DISTRIBUTION:\n");
    for (group, members) in &by_group {
        let label = if *group == ROOT_LABEL { "(root group)" } else { *group };
        let plural = if members.len() == 1 { "" } else { "s" };
        out.push_str(&format!("   - {label:<40} {:>3} user{plural}\n", members.len()));
    }

    if detailed {
        out.push_str(&format!("\n{}\nDETAILED USER BREAKDOWN\n{}\n", "=".repeat(80), "=".repeat(80)));
        for (group, members) in &by_group {
            let label = if *group == ROOT_LABEL { "ROOT GROUP".to_string() } else { group.to_uppercase() };
            out.push_str(&format!("\n{label} ({} users):\n", members.len()));

            let mut members = members.clone();
            members.sort_by(|a, b| a.user_name.cmp(&b.user_name));
            for user in members {
                let real_email_info = match &user.real_email {
                    Some(real) if real != &user.email => format!(" [real: {real}]"),
                    _ => String::new(),
                };
                out.push_str(&format!("   {} <{}>{real_email_info}\n", user.user_name, user.email));
            }
        }
    }

    out.push_str(&format!("\n{}\nCSV OUTPUT (ALL USERS)\n{}\n", "=".repeat(80), "=".repeat(80)));
    out.push_str(&render_csv(users));
    out
}

fn render_csv(users: &[TargetUser]) -> String {
    let mut out = String::from("external_id,name,job_title,department,status,supervisor_id,role\n");
    for user in users {
        let (job_title, name) = parse_display_name(&user.user_name);
        let status = if user.is_active() { "active" } else { "inactive" };
        let supervisor_id = user
            .raw_data
            .get("supervisor_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        let role = format!("{:?}", user.role).to_lowercase();
        let fields = [
            user.external_id.as_str(),
            name.as_str(),
            job_title.as_str(),
            user.groups_breadcrumb.as_str(),
            status,
            supervisor_id,
            role.as_str(),
        ];
        let row: Vec<String> = fields.iter().map(|field| csv_escape(field)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
