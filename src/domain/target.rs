//! The Target Document: the sole handoff between the offline modeller and
//! the network-bound reconciler.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// TimeCamp access levels, with their wire ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Supervisor,
    #[default]
    User,
    Guest,
}

impl Role {
    pub fn role_id(&self) -> &'static str {
        match self {
            Role::Administrator => "1",
            Role::Supervisor => "2",
            Role::User => "3",
            Role::Guest => "5",
        }
    }

    /// Unknown ids map to the regular user role.
    pub fn from_role_id(id: &str) -> Self {
        match id {
            "1" => Role::Administrator,
            "2" => Role::Supervisor,
            "5" => Role::Guest,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// One canonical user record, ready to reconcile against the target account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetUser {
    #[serde(rename = "timecamp_external_id")]
    pub external_id: String,
    #[serde(rename = "timecamp_user_name")]
    pub user_name: String,
    #[serde(rename = "timecamp_email")]
    pub email: String,
    #[serde(rename = "timecamp_real_email", default, skip_serializing_if = "Option::is_none")]
    pub real_email: Option<String>,
    /// Slash-separated path below the root group; `""` means the root itself.
    #[serde(rename = "timecamp_groups_breadcrumb")]
    pub groups_breadcrumb: String,
    #[serde(rename = "timecamp_status")]
    pub status: UserStatus,
    #[serde(rename = "timecamp_role")]
    pub role: Role,
    pub raw_data: Value,
}

impl TargetUser {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}
