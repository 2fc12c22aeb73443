//! Shared fixtures: a recording in-memory target API and config builders.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::{Value, json};
use timecamp_sync::domain::{SyncConfig, SyncError, TargetUser};
use timecamp_sync::ports::{ApiGroup, ApiUser, RoleAssignment, TargetApi, UserUpdate};

pub const ROOT_GROUP_ID: i64 = 100;

#[derive(Debug, Clone)]
struct FakeUser {
    user_id: i64,
    email: String,
    display_name: String,
    group_id: i64,
    settings: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeState {
    groups: Vec<(i64, String, i64)>,
    users: Vec<FakeUser>,
    roles: HashMap<i64, Vec<(i64, String)>>,
    next_group_id: i64,
    next_user_id: i64,
    calls: Vec<String>,
}

/// In-memory target account that records every mutating call in order.
pub struct FakeApi {
    state: Mutex<FakeState>,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn new() -> Self {
        let state = FakeState {
            groups: vec![(ROOT_GROUP_ID, "Root".to_string(), 0)],
            next_group_id: 1000,
            next_user_id: 500,
            ..Default::default()
        };
        Self { state: Mutex::new(state) }
    }

    pub fn add_existing_group(&self, group_id: i64, name: &str, parent_id: i64) {
        self.state.lock().unwrap().groups.push((group_id, name.to_string(), parent_id));
    }

    pub fn add_existing_user(&self, user_id: i64, email: &str, name: &str, group_id: i64) {
        let mut state = self.state.lock().unwrap();
        state.users.push(FakeUser {
            user_id,
            email: email.to_string(),
            display_name: name.to_string(),
            group_id,
            settings: HashMap::new(),
        });
        state.roles.entry(user_id).or_default().push((group_id, "3".to_string()));
    }

    pub fn set_setting(&self, user_id: i64, name: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let user = state.users.iter_mut().find(|u| u.user_id == user_id).expect("unknown user");
        user.settings.insert(name.to_string(), value.to_string());
    }

    pub fn set_role(&self, user_id: i64, group_id: i64, role_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.roles.insert(user_id, vec![(group_id, role_id.to_string())]);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn group_named(&self, name: &str) -> Option<i64> {
        self.state.lock().unwrap().groups.iter().find(|(_, n, _)| n == name).map(|(id, _, _)| *id)
    }

    pub fn user_id_for(&self, email: &str) -> Option<i64> {
        self.state.lock().unwrap().users.iter().find(|u| u.email == email).map(|u| u.user_id)
    }

    pub fn setting_of(&self, user_id: i64, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .and_then(|u| u.settings.get(name).cloned())
    }

    pub fn group_of(&self, user_id: i64) -> Option<i64> {
        self.state.lock().unwrap().users.iter().find(|u| u.user_id == user_id).map(|u| u.group_id)
    }
}

impl TargetApi for FakeApi {
    fn users(&self) -> Result<Vec<ApiUser>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .map(|user| ApiUser {
                user_id: user.user_id,
                email: user.email.clone(),
                display_name: user.display_name.clone(),
                group_id: Some(user.group_id),
                is_enabled: user.settings.get("disabled_user").map(String::as_str) != Some("1"),
            })
            .collect())
    }

    fn groups(&self) -> Result<Vec<ApiGroup>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .iter()
            .map(|(group_id, name, parent_id)| ApiGroup {
                group_id: *group_id,
                name: name.clone(),
                parent_id: Some(*parent_id),
            })
            .collect())
    }

    fn add_group(&self, name: &str, parent_id: i64) -> Result<i64, SyncError> {
        let mut state = self.state.lock().unwrap();
        let group_id = state.next_group_id;
        state.next_group_id += 1;
        state.groups.push((group_id, name.to_string(), parent_id));
        state.calls.push(format!("add_group:{name}:{parent_id}"));
        Ok(group_id)
    }

    fn delete_group(&self, group_id: i64) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.groups.retain(|(id, _, _)| *id != group_id);
        state.calls.push(format!("delete_group:{group_id}"));
        Ok(())
    }

    fn add_user(&self, email: &str, _name: &str, group_id: i64) -> Result<Value, SyncError> {
        let mut state = self.state.lock().unwrap();
        let user_id = state.next_user_id;
        state.next_user_id += 1;
        state.users.push(FakeUser {
            user_id,
            email: email.to_string(),
            display_name: email.to_string(),
            group_id,
            settings: HashMap::new(),
        });
        state.roles.entry(user_id).or_default().push((group_id, "3".to_string()));
        state.calls.push(format!("add_user:{email}:{group_id}"));
        Ok(json!({"message": "ok"}))
    }

    fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
        current_group_id: i64,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();

        if let Some(full_name) = &update.full_name {
            if let Some(user) = state.users.iter_mut().find(|u| u.user_id == user_id) {
                user.display_name = full_name.clone();
            }
            state.calls.push(format!("set_name:{user_id}:{full_name}"));
        }
        if let Some(group_id) = update.group_id {
            if let Some(user) = state.users.iter_mut().find(|u| u.user_id == user_id) {
                user.group_id = group_id;
            }
            // Membership carries the role grant along.
            if let Some(assignments) = state.roles.get_mut(&user_id) {
                for assignment in assignments.iter_mut() {
                    if assignment.0 == current_group_id {
                        assignment.0 = group_id;
                    }
                }
            }
            state.calls.push(format!("move_user:{user_id}:{group_id}"));
        }
        if let Some(role_id) = &update.role_id {
            let group_id = state
                .users
                .iter()
                .find(|u| u.user_id == user_id)
                .map(|u| u.group_id)
                .unwrap_or(current_group_id);
            state.roles.insert(user_id, vec![(group_id, role_id.clone())]);
            state.calls.push(format!("set_role:{user_id}:{role_id}"));
        }
        Ok(())
    }

    fn update_user_setting(&self, user_id: i64, name: &str, value: &str) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.user_id == user_id) {
            user.settings.insert(name.to_string(), value.to_string());
        }
        state.calls.push(format!("set_setting:{user_id}:{name}={value}"));
        Ok(())
    }

    fn user_settings(
        &self,
        user_ids: &[i64],
        name: &str,
    ) -> Result<HashMap<i64, Option<String>>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(user_ids
            .iter()
            .map(|user_id| {
                let value = state
                    .users
                    .iter()
                    .find(|u| u.user_id == *user_id)
                    .and_then(|u| u.settings.get(name).cloned());
                (*user_id, value)
            })
            .collect())
    }

    fn user_roles(&self) -> Result<HashMap<String, Vec<RoleAssignment>>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .roles
            .iter()
            .map(|(user_id, assignments)| {
                let assignments = assignments
                    .iter()
                    .map(|(group_id, role_id)| RoleAssignment {
                        group_id: group_id.to_string(),
                        role_id: role_id.clone(),
                    })
                    .collect();
                (user_id.to_string(), assignments)
            })
            .collect())
    }
}

/// A config with every gate open and the fake's root group.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        api_key: "test-key".into(),
        domain: "app.timecamp.com".into(),
        root_group_id: ROOT_GROUP_ID,
        ignored_user_ids: HashSet::new(),
        show_external_id: false,
        skip_departments: String::new(),
        use_supervisor_groups: false,
        use_department_groups: true,
        use_job_title_name_users: false,
        use_job_title_name_groups: false,
        replace_email_domain: String::new(),
        use_is_supervisor_role: false,
        exclude_regex: String::new(),
        change_groups_regex: String::new(),
        disable_new_users: false,
        disable_user_deactivation: false,
        disable_external_id_sync: false,
        disable_additional_email_sync: false,
        disable_manual_user_updates: false,
        disable_group_updates: false,
        disable_role_updates: false,
        disable_groups_creation: false,
        disabled_users_group_id: 0,
        prepare_transform_config: String::new(),
        remove_empty_groups: false,
        ssl_verify: true,
    }
}

/// A document entry; `user_name` defaults to the email, which matches what
/// the target assigns at creation time.
#[allow(dead_code)]
pub fn document_user(email: &str, breadcrumb: &str, status: &str) -> TargetUser {
    serde_json::from_value(json!({
        "timecamp_external_id": "",
        "timecamp_user_name": email,
        "timecamp_email": email,
        "timecamp_groups_breadcrumb": breadcrumb,
        "timecamp_status": status,
        "timecamp_role": "user",
        "raw_data": {}
    }))
    .unwrap()
}
