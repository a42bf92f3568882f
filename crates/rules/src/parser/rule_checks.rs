//! Top-level field checks: identity, flags, priority, cooldown, scoping.

use serde_json::{Map, Value};

use super::fuzzy::fuzzy_match;
use crate::model::MAX_COOLDOWN_SECONDS;
use super::validation::ValidationResult;

pub(super) const KNOWN_FIELDS: &[&str] = &[
    "rule_id",
    "name",
    "description",
    "enabled",
    "priority",
    "conditions",
    "actions",
    "cooldown_seconds",
    "category_id",
    "model_id",
];

const REQUIRED_FIELDS: &[&str] = &["rule_id", "name", "conditions", "actions"];

pub(super) fn validate_required(dsl: &Map<String, Value>, result: &mut ValidationResult) {
    for &field in REQUIRED_FIELDS {
        if !dsl.contains_key(field) {
            result.error(field, "required field is missing");
        }
    }
}

pub(super) fn validate_identity(dsl: &Map<String, Value>, result: &mut ValidationResult) {
    for field in ["rule_id", "name"] {
        match dsl.get(field) {
            None => {}
            Some(Value::String(s)) if s.trim().is_empty() => {
                result.error(field, "must not be empty");
            }
            Some(Value::String(_)) => {}
            Some(other) => {
                result.error(field, format!("must be a string, got {}", type_name(other)));
            }
        }
    }

    match dsl.get("description") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(other) => {
            result.error(
                "description",
                format!("must be a string, got {}", type_name(other)),
            );
        }
    }
}

pub(super) fn validate_flags(dsl: &Map<String, Value>, result: &mut ValidationResult) {
    if let Some(enabled) = dsl.get("enabled") {
        if !enabled.is_boolean() {
            result.error(
                "enabled",
                format!("must be a boolean, got {}", type_name(enabled)),
            );
        }
    }

    if let Some(priority) = dsl.get("priority") {
        if priority.as_i64().is_none() {
            result.error(
                "priority",
                format!("must be an integer, got {}", describe(priority)),
            );
        }
    }

    if let Some(cooldown) = dsl.get("cooldown_seconds") {
        match cooldown.as_u64() {
            None => result.error(
                "cooldown_seconds",
                format!("must be a non-negative integer, got {}", describe(cooldown)),
            ),
            Some(seconds) if seconds > MAX_COOLDOWN_SECONDS => result.error(
                "cooldown_seconds",
                format!("must be at most {MAX_COOLDOWN_SECONDS} seconds, got {seconds}"),
            ),
            Some(_) => {}
        }
    }

    for field in ["category_id", "model_id"] {
        match dsl.get(field) {
            None | Some(Value::Null) => {}
            Some(v) if v.as_i64().is_some() => {}
            Some(other) => {
                result.error(
                    field,
                    format!("must be an integer, got {}", describe(other)),
                );
            }
        }
    }
}

pub(super) fn warn_unknown_fields(dsl: &Map<String, Value>, result: &mut ValidationResult) {
    for key in dsl.keys() {
        if KNOWN_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let message = match fuzzy_match(key, KNOWN_FIELDS) {
            Some(suggestion) => format!("unknown field is ignored (did you mean '{suggestion}'?)"),
            None => "unknown field is ignored".to_string(),
        };
        result.warn(key.as_str(), message);
    }
}

/// JSON type name for error messages.
pub(super) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Type name plus the literal for scalars, e.g. `number (-5)`.
pub(super) fn describe(value: &Value) -> String {
    match value {
        Value::Number(_) | Value::Bool(_) => format!("{} ({value})", type_name(value)),
        Value::String(s) => format!("string ('{s}')"),
        other => type_name(other).to_string(),
    }
}
