//! `TargetApi` implementation over the TimeCamp third-party HTTP API.

use std::collections::HashMap;

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::adapters::http::{HttpClient, RetryPolicy};
use crate::domain::{SyncConfig, SyncError};
use crate::ports::target_api::{ApiGroup, ApiUser, RoleAssignment, TargetApi, UserUpdate, de_id};

const SETTINGS_BATCH_SIZE: usize = 200;

pub struct TimeCampApi {
    http: HttpClient,
    group_creation_policy: RetryPolicy,
}

impl TimeCampApi {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self {
            http: HttpClient::new(config)?,
            group_creation_policy: RetryPolicy::group_creation(),
        })
    }

    /// For tests: point at an arbitrary base URL with fast retries.
    pub fn with_client(http: HttpClient, group_creation_policy: RetryPolicy) -> Self {
        Self { http, group_creation_policy }
    }
}

/// The settings endpoint has been observed answering in two shapes: a map
/// keyed by user id, and a flat list of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SettingsResponse {
    ByUser(HashMap<String, Value>),
    Flat(Vec<FlatSetting>),
}

#[derive(Debug, Deserialize)]
struct FlatSetting {
    #[serde(rename = "userId", deserialize_with = "de_id")]
    user_id: i64,
    name: String,
    #[serde(default)]
    value: Option<Value>,
}

fn setting_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl TargetApi for TimeCampApi {
    fn users(&self) -> Result<Vec<ApiUser>, SyncError> {
        let raw = self.http.request(Method::GET, "users", None, &[])?;
        let mut users: Vec<ApiUser> = serde_json::from_value(raw)?;

        let ids: Vec<i64> = users.iter().map(|user| user.user_id).collect();
        let enabled = self.users_enabled(&ids)?;
        for user in &mut users {
            user.is_enabled = enabled.get(&user.user_id).copied().unwrap_or(true);
        }
        Ok(users)
    }

    fn groups(&self) -> Result<Vec<ApiGroup>, SyncError> {
        let raw = self.http.request(Method::GET, "group", None, &[])?;
        Ok(serde_json::from_value(raw)?)
    }

    fn add_group(&self, name: &str, parent_id: i64) -> Result<i64, SyncError> {
        let body = json!({"name": name, "parent_id": parent_id.to_string()});
        let response = self.http.request_with_policy(
            Method::PUT,
            "group",
            Some(&body),
            &[],
            &self.group_creation_policy,
        )?;
        match response.get("group_id") {
            Some(Value::String(id)) => id.parse().map_err(|_| SyncError::Api {
                status: 200,
                message: format!("group creation returned a bad id '{id}'"),
            }),
            Some(Value::Number(id)) => id.as_i64().ok_or(SyncError::Api {
                status: 200,
                message: "group creation returned an out-of-range id".to_string(),
            }),
            _ => Err(SyncError::Api {
                status: 200,
                message: format!("group creation response missing group_id: {response}"),
            }),
        }
    }

    // Deletion shares the creation policy: the server intermittently
    // answers 403 while the tree is being reshaped.
    fn delete_group(&self, group_id: i64) -> Result<(), SyncError> {
        self.http.request_with_policy(
            Method::DELETE,
            &format!("group/{group_id}"),
            None,
            &[],
            &self.group_creation_policy,
        )?;
        Ok(())
    }

    // Creation is by email only; the display name is applied by a later
    // update_user call.
    fn add_user(&self, email: &str, _name: &str, group_id: i64) -> Result<Value, SyncError> {
        let body = json!({
            "email": [email],
            "tt_global_admin": "0",
            "tt_can_create_level_1_tasks": "0",
            "can_view_rates": "0",
            "add_to_all_projects": "0",
            "send_email": "0",
        });
        self.http.request(Method::POST, &format!("group/{group_id}/user"), Some(&body), &[])
    }

    fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
        current_group_id: i64,
    ) -> Result<(), SyncError> {
        if let Some(full_name) = &update.full_name {
            let body = json!({"display_name": full_name, "user_id": user_id.to_string()});
            self.http.request(Method::POST, "user", Some(&body), &[])?;
        }
        if let Some(group_id) = update.group_id {
            let body = json!({"group_id": group_id.to_string(), "user_id": user_id.to_string()});
            self.http.request(
                Method::PUT,
                &format!("group/{current_group_id}/user"),
                Some(&body),
                &[],
            )?;
        }
        if let Some(role_id) = &update.role_id {
            let body = json!({"role_id": role_id, "user_id": user_id.to_string()});
            self.http.request(
                Method::PUT,
                &format!("group/{current_group_id}/user"),
                Some(&body),
                &[],
            )?;
        }
        Ok(())
    }

    fn update_user_setting(&self, user_id: i64, name: &str, value: &str) -> Result<(), SyncError> {
        let body = json!({"name": name, "value": value});
        self.http.request(Method::PUT, &format!("user/{user_id}/setting"), Some(&body), &[])?;
        Ok(())
    }

    fn user_settings(
        &self,
        user_ids: &[i64],
        name: &str,
    ) -> Result<HashMap<i64, Option<String>>, SyncError> {
        let mut result = HashMap::new();

        for batch in user_ids.chunks(SETTINGS_BATCH_SIZE) {
            let ids =
                batch.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
            let raw = self.http.request(
                Method::GET,
                &format!("user/{ids}/setting"),
                None,
                &[("name[]", name)],
            )?;
            let response: SettingsResponse = serde_json::from_value(raw)?;

            match response {
                SettingsResponse::ByUser(map) => {
                    for user_id in batch {
                        let value = map
                            .get(&user_id.to_string())
                            .and_then(Value::as_array)
                            .and_then(|entries| {
                                entries.iter().find(|entry| {
                                    entry.get("name").and_then(Value::as_str) == Some(name)
                                })
                            })
                            .and_then(|entry| entry.get("value"))
                            .and_then(setting_value);
                        result.insert(*user_id, value);
                    }
                }
                SettingsResponse::Flat(entries) => {
                    for user_id in batch {
                        let value = entries
                            .iter()
                            .find(|entry| entry.user_id == *user_id && entry.name == name)
                            .and_then(|entry| entry.value.as_ref())
                            .and_then(setting_value);
                        result.insert(*user_id, value);
                    }
                }
            }
        }

        Ok(result)
    }

    fn user_roles(&self) -> Result<HashMap<String, Vec<RoleAssignment>>, SyncError> {
        let raw = self.http.request(Method::GET, "people_picker", None, &[])?;
        let mut user_roles: HashMap<String, Vec<RoleAssignment>> = HashMap::new();

        let groups = raw.get("groups").and_then(Value::as_object);
        for group in groups.into_iter().flat_map(|map| map.values()) {
            let Some(group_id) = group.get("group_id").map(id_string) else {
                continue;
            };
            // Users arrive as a dict in the common case; an empty group is
            // reported as a bare list.
            let Some(users) = group.get("users").and_then(Value::as_object) else {
                continue;
            };
            for (user_id, user) in users {
                let role_id = user.get("role_id").map(id_string).unwrap_or_default();
                user_roles
                    .entry(user_id.clone())
                    .or_default()
                    .push(RoleAssignment { group_id: group_id.clone(), role_id });
            }
        }

        Ok(user_roles)
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
