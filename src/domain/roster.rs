//! Roster records as emitted by the source-system extractors.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::SyncError;

/// One person from the external directory.
///
/// `external_id` uniquely keys the user within a run and is required for a
/// user to reach the Target Document; users without one still participate in
/// group derivation. Unknown source fields are preserved in `extra` so they
/// survive into `raw_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterUser {
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_email: Option<String>,
    #[serde(default)]
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub supervisor_id: String,
    /// Tri-valued: directories that report the relation directly send a
    /// boolean or a string; absent means "derive it structurally".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_supervisor: Option<TriFlag>,
    #[serde(default)]
    pub force_supervisor_role: bool,
    #[serde(default)]
    pub force_global_admin_role: bool,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn default_status() -> String {
    "active".to_string()
}

impl RosterUser {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }

    pub fn has_supervisor(&self) -> bool {
        !self.supervisor_id.trim().is_empty()
    }
}

/// Boolean-ish flag accepted as a JSON bool, number, or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriFlag {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl TriFlag {
    /// `true`/`1`/`yes` and `false`/`0`/`no` in any case; anything else is
    /// treated as unknown.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TriFlag::Bool(value) => Some(*value),
            TriFlag::Number(1) => Some(true),
            TriFlag::Number(0) => Some(false),
            TriFlag::Number(_) => None,
            TriFlag::Text(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
        }
    }
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

/// The full extract: `{"users": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub users: Vec<RosterUser>,
}

impl Roster {
    /// Parse a raw roster document and normalise emails to lower case.
    pub fn from_json(value: Value) -> Result<Self, SyncError> {
        let mut roster: Roster = serde_json::from_value(value)?;
        for user in &mut roster.users {
            user.email = user.email.to_lowercase();
            if let Some(real_email) = &user.real_email {
                user.real_email = Some(real_email.to_lowercase());
            }
        }
        Ok(roster)
    }
}
