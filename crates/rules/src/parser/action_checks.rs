//! Action list checks: recognized types and type-specific required keys.

use serde_json::{Map, Value};

use crate::model::action_types;

use super::fuzzy::fuzzy_match;
use super::rule_checks::type_name;
use super::validation::{child, index, ValidationResult};

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

pub(super) fn validate_actions(
    value: &Value,
    known_types: &[&str],
    result: &mut ValidationResult,
) {
    let actions = match value {
        Value::Array(items) if items.is_empty() => {
            result.error("actions", "must contain at least one action");
            return;
        }
        Value::Array(items) => items,
        other => {
            result.error(
                "actions",
                format!("must be a list, got {}", type_name(other)),
            );
            return;
        }
    };

    for (i, action) in actions.iter().enumerate() {
        let path = index("actions", i);
        match action {
            Value::Object(map) => validate_action(map, &path, known_types, result),
            other => result.error(
                path,
                format!("must be a mapping, got {}", type_name(other)),
            ),
        }
    }
}

fn validate_action(
    action: &Map<String, Value>,
    path: &str,
    known_types: &[&str],
    result: &mut ValidationResult,
) {
    let type_path = child(path, "type");
    let action_type = match action.get("type") {
        None => {
            result.error(type_path, "required field is missing");
            return;
        }
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            result.error(
                type_path,
                format!("must be a string, got {}", type_name(other)),
            );
            return;
        }
    };

    if !known_types.contains(&action_type) {
        result.error_with_suggestion(
            type_path,
            format!("unknown action type '{action_type}'"),
            fuzzy_match(action_type, known_types),
        );
        return;
    }

    match action_type {
        action_types::NOTIFICATION => validate_notification(action, path, result),
        action_types::WEBHOOK => validate_webhook(action, path, result),
        _ => {}
    }
}

fn validate_notification(action: &Map<String, Value>, path: &str, result: &mut ValidationResult) {
    let channels_path = child(path, "channels");
    match action.get("channels") {
        None => result.error(
            channels_path,
            "notification action requires a `channels` list",
        ),
        Some(Value::Array(channels)) => {
            if channels.is_empty() {
                result.warn(channels_path.as_str(), "no channels listed; the action always fails");
            }
            for (i, channel) in channels.iter().enumerate() {
                if !channel.is_string() {
                    result.error(
                        index(&channels_path, i),
                        format!("channel name must be a string, got {}", type_name(channel)),
                    );
                }
            }
        }
        Some(other) => result.error(
            channels_path,
            format!("must be a list, got {}", type_name(other)),
        ),
    }
}

fn validate_webhook(action: &Map<String, Value>, path: &str, result: &mut ValidationResult) {
    let url_path = child(path, "url");
    match action.get("url") {
        None => result.error(url_path, "webhook action requires a `url`"),
        Some(Value::String(url)) if url.trim().is_empty() => {
            result.error(url_path, "must not be empty");
        }
        Some(Value::String(_)) => {}
        Some(other) => result.error(
            url_path,
            format!("must be a string, got {}", type_name(other)),
        ),
    }

    if let Some(method) = action.get("method") {
        let method_path = child(path, "method");
        match method.as_str() {
            Some(m) if HTTP_METHODS.contains(&m.to_uppercase().as_str()) => {}
            Some(m) => result.error_with_suggestion(
                method_path,
                format!("unsupported HTTP method '{m}'"),
                fuzzy_match(m, HTTP_METHODS),
            ),
            None => result.error(
                method_path,
                format!("must be a string, got {}", type_name(method)),
            ),
        }
    }

    if let Some(timeout) = action.get("timeout_seconds") {
        let positive = timeout.as_f64().map(|t| t > 0.0).unwrap_or(false);
        if !positive {
            result.error(
                child(path, "timeout_seconds"),
                "must be a positive number",
            );
        }
    }
}
