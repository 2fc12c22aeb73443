//! JSON-shaped filter + mutation rules applied to the raw roster before
//! modelling.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::domain::SyncError;

/// Load a transform document from an inline JSON literal or a file path.
/// Empty input means "no transform". Malformed JSON is fatal.
pub fn load_transform_config(config_value: &str) -> Result<Option<Value>, SyncError> {
    let config_value = config_value.trim();
    if config_value.is_empty() {
        return Ok(None);
    }

    if config_value.starts_with('{') || config_value.starts_with('[') {
        let parsed = serde_json::from_str(config_value)
            .map_err(|err| SyncError::config(format!("Malformed transform config JSON: {err}")))?;
        return Ok(Some(parsed));
    }

    if !Path::new(config_value).exists() {
        return Err(SyncError::config(format!("Transform config file not found: {config_value}")));
    }
    let content = fs::read_to_string(config_value)?;
    let parsed = serde_json::from_str(&content).map_err(|err| {
        SyncError::config(format!("Malformed transform config in {config_value}: {err}"))
    })?;
    Ok(Some(parsed))
}

/// Apply the transform to any JSON-like value. Arrays are transformed
/// element-wise; objects are mutated only when the filter matches.
/// Returns the (possibly) new value and whether anything changed.
pub fn apply_transform(data: &Value, config: Option<&Value>) -> (Value, bool) {
    let Some(config) = config else {
        return (data.clone(), false);
    };

    if let Value::Array(items) = data {
        let mut changed_any = false;
        let mut output = Vec::with_capacity(items.len());
        for item in items {
            let (updated, changed) = apply_transform(item, Some(config));
            output.push(updated);
            changed_any = changed_any || changed;
        }
        return (Value::Array(output), changed_any);
    }

    if !data.is_object() {
        return (data.clone(), false);
    }

    if !matches_filter(data, config.get("filter")) {
        return (data.clone(), false);
    }

    let mut output = data.clone();
    let mut changed = false;

    let rules = config.get("transform").and_then(Value::as_array);
    for rule in rules.into_iter().flatten() {
        let Some(property) = rule.get("property").and_then(Value::as_str) else {
            continue;
        };
        match rule.get("action").and_then(Value::as_str) {
            Some("replace_all") => {
                let new_value = rule.get("value").cloned().unwrap_or(Value::Null);
                if get_value(&output, property) != Some(&new_value)
                    && set_value(&mut output, property, new_value)
                {
                    changed = true;
                }
            }
            other => debug!("Skipping transform rule with unknown action {other:?}"),
        }
    }

    (output, changed)
}

fn matches_filter(data: &Value, filter: Option<&Value>) -> bool {
    let Some(filter) = filter else {
        return true;
    };

    if let Some(rules) = filter.get("and").and_then(Value::as_array) {
        return rules.iter().all(|rule| matches_filter(data, Some(rule)));
    }
    if let Some(rules) = filter.get("or").and_then(Value::as_array) {
        return rules.iter().any(|rule| matches_filter(data, Some(rule)));
    }

    let Some(property) = filter.get("property").and_then(Value::as_str) else {
        return false;
    };
    let Some(string_rules) = filter.get("string").and_then(Value::as_object) else {
        return false;
    };
    let Some(value) = get_value(data, property) else {
        return false;
    };
    if value.is_null() {
        return false;
    }

    let value = stringify(value);
    if let Some(expected) = string_rules.get("equals") {
        return value == stringify(expected);
    }
    if let Some(prefix) = string_rules.get("starts_with") {
        return value.starts_with(&stringify(prefix));
    }
    if let Some(suffix) = string_rules.get("ends_with") {
        return value.ends_with(&stringify(suffix));
    }
    if let Some(needle) = string_rules.get("contains") {
        return value.contains(&stringify(needle));
    }

    false
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Walk a dotted path; numeric components index into arrays.
fn get_value<'a>(data: &'a Value, property_path: &str) -> Option<&'a Value> {
    let mut current = data;
    for part in property_path.split('.').filter(|p| !p.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_value(data: &mut Value, property_path: &str, value: Value) -> bool {
    let parts: Vec<&str> = property_path.split('.').filter(|p| !p.is_empty()).collect();
    let Some((last, parents)) = parts.split_last() else {
        return false;
    };

    let mut current = data;
    for part in parents {
        current = match current {
            Value::Object(map) => {
                let entry = map.entry(part.to_string()).or_insert_with(|| Value::Object(Default::default()));
                if !entry.is_object() && !entry.is_array() {
                    *entry = Value::Object(Default::default());
                }
                entry
            }
            Value::Array(items) => {
                let Some(index) = part.parse::<usize>().ok().filter(|i| *i < items.len()) else {
                    return false;
                };
                let slot = &mut items[index];
                if !slot.is_object() && !slot.is_array() {
                    *slot = Value::Object(Default::default());
                }
                slot
            }
            _ => return false,
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>().ok().filter(|i| *i < items.len()) {
            Some(index) => {
                items[index] = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}
