//! Port for the target account's HTTP API.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::SyncError;

/// A user as observed on the target, with the enabled state already joined
/// in from the bulk `disabled_user` lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    #[serde(deserialize_with = "de_id")]
    pub user_id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub group_id: Option<i64>,
    #[serde(skip_deserializing, default = "default_true")]
    pub is_enabled: bool,
}

/// A node of the target's group tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGroup {
    #[serde(deserialize_with = "de_id")]
    pub group_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub parent_id: Option<i64>,
}

/// One role grant from the role mosaic, in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub group_id: String,
    pub role_id: String,
}

/// Per-field user mutation; only supplied fields produce API calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub group_id: Option<i64>,
    pub role_id: Option<String>,
}

/// Operations the reconcilers drive against the target account.
pub trait TargetApi {
    /// All users, with `is_enabled` populated.
    fn users(&self) -> Result<Vec<ApiUser>, SyncError>;
    /// Flat list of all groups.
    fn groups(&self) -> Result<Vec<ApiGroup>, SyncError>;
    /// Create a group, returning its id.
    fn add_group(&self, name: &str, parent_id: i64) -> Result<i64, SyncError>;
    fn delete_group(&self, group_id: i64) -> Result<(), SyncError>;
    /// Invite a user into a group; returns the raw creation descriptor.
    fn add_user(&self, email: &str, name: &str, group_id: i64) -> Result<Value, SyncError>;
    /// Apply the supplied fields. `current_group_id` scopes the membership
    /// and role calls.
    fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
        current_group_id: i64,
    ) -> Result<(), SyncError>;
    fn update_user_setting(&self, user_id: i64, name: &str, value: &str) -> Result<(), SyncError>;
    /// One named setting for many users, batched server-side.
    fn user_settings(
        &self,
        user_ids: &[i64],
        name: &str,
    ) -> Result<HashMap<i64, Option<String>>, SyncError>;
    /// Role grants per user id (stringly keyed, as the mosaic reports them).
    fn user_roles(&self) -> Result<HashMap<String, Vec<RoleAssignment>>, SyncError>;

    fn set_additional_email(&self, user_id: i64, email: &str) -> Result<(), SyncError> {
        self.update_user_setting(user_id, "additional_email", email)
    }

    fn additional_emails(
        &self,
        user_ids: &[i64],
    ) -> Result<HashMap<i64, Option<String>>, SyncError> {
        self.user_settings(user_ids, "additional_email")
    }

    fn external_ids(&self, user_ids: &[i64]) -> Result<HashMap<i64, Option<String>>, SyncError> {
        self.user_settings(user_ids, "external_id")
    }

    fn manually_added(&self, user_ids: &[i64]) -> Result<HashMap<i64, bool>, SyncError> {
        let settings = self.user_settings(user_ids, "added_manually")?;
        Ok(settings.into_iter().map(|(id, value)| (id, value.as_deref() == Some("1"))).collect())
    }

    fn users_enabled(&self, user_ids: &[i64]) -> Result<HashMap<i64, bool>, SyncError> {
        let settings = self.user_settings(user_ids, "disabled_user")?;
        Ok(settings.into_iter().map(|(id, value)| (id, value.as_deref() != Some("1"))).collect())
    }
}

fn default_true() -> bool {
    true
}

/// Ids arrive as strings or numbers depending on the endpoint.
pub(crate) fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => {
            n.as_i64().ok_or_else(|| serde::de::Error::custom("id out of range"))
        }
        Value::String(s) => {
            s.trim().parse().map_err(|_| serde::de::Error::custom(format!("bad id '{s}'")))
        }
        other => Err(serde::de::Error::custom(format!("expected id, got {other}"))),
    }
}

pub(crate) fn de_opt_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_i64()),
        Some(Value::String(s)) => Ok(s.trim().parse().ok()),
        Some(other) => Err(serde::de::Error::custom(format!("expected id, got {other}"))),
    }
}
