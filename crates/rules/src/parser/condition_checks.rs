//! Recursive condition tree checks.

use serde_json::{Map, Value};
use verdict_core::as_f64;

use crate::model::{ConditionOperator, LogicalOperator};

use super::fuzzy::fuzzy_match;
use super::rule_checks::type_name;
use super::validation::{child, index, ValidationResult};

const LOGICAL_NAMES: &[&str] = &["AND", "OR"];

/// Validate the root `conditions` value, which must be a group.
pub(super) fn validate_root(value: &Value, max_depth: usize, result: &mut ValidationResult) {
    match value {
        Value::Object(map) if map.contains_key("rules") => {
            validate_group(map, "conditions", 1, max_depth, result);
        }
        Value::Object(_) => {
            result.error(
                "conditions",
                "must be a condition group with `type` and `rules`",
            );
        }
        other => {
            result.error(
                "conditions",
                format!("must be a mapping, got {}", type_name(other)),
            );
        }
    }
}

fn validate_node(
    value: &Value,
    path: &str,
    depth: usize,
    max_depth: usize,
    result: &mut ValidationResult,
) {
    match value {
        Value::Object(map) if map.contains_key("rules") => {
            validate_group(map, path, depth, max_depth, result);
        }
        Value::Object(map) => validate_leaf(map, path, result),
        other => {
            result.error(
                path,
                format!(
                    "must be a condition or condition group, got {}",
                    type_name(other)
                ),
            );
        }
    }
}

fn validate_group(
    group: &Map<String, Value>,
    path: &str,
    depth: usize,
    max_depth: usize,
    result: &mut ValidationResult,
) {
    if depth > max_depth {
        result.error(
            path,
            format!("condition groups nest deeper than the maximum of {max_depth}"),
        );
        return;
    }

    let type_path = child(path, "type");
    match group.get("type") {
        None => result.error(type_path, "required field is missing (AND or OR)"),
        Some(Value::String(s)) if LogicalOperator::from_name(s).is_some() => {}
        Some(Value::String(s)) => result.error_with_suggestion(
            type_path,
            format!("unknown logical operator '{s}', expected AND or OR"),
            fuzzy_match(s, LOGICAL_NAMES),
        ),
        Some(other) => result.error(
            type_path,
            format!("must be a string, got {}", type_name(other)),
        ),
    }

    let rules_path = child(path, "rules");
    match group.get("rules") {
        Some(Value::Array(items)) if items.is_empty() => {
            result.error(rules_path, "must contain at least one condition");
        }
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_node(item, &index(&rules_path, i), depth + 1, max_depth, result);
            }
        }
        Some(other) => result.error(
            rules_path,
            format!("must be a list, got {}", type_name(other)),
        ),
        None => result.error(rules_path, "required field is missing"),
    }
}

fn validate_leaf(leaf: &Map<String, Value>, path: &str, result: &mut ValidationResult) {
    let field_path = child(path, "field");
    match leaf.get("field") {
        None => result.error(field_path, "required field is missing"),
        Some(Value::String(s)) if s.trim().is_empty() => {
            result.error(field_path, "must not be empty");
        }
        Some(Value::String(_)) => {}
        Some(other) => result.error(
            field_path,
            format!("must be a string, got {}", type_name(other)),
        ),
    }

    let operator_path = child(path, "operator");
    let operator = match leaf.get("operator") {
        None => {
            result.error(operator_path, "required field is missing");
            None
        }
        Some(Value::String(s)) => match ConditionOperator::from_name(s) {
            Some(op) => Some(op),
            None => {
                let names: Vec<&str> = ConditionOperator::ALL.iter().map(|o| o.as_str()).collect();
                result.error_with_suggestion(
                    operator_path,
                    format!("unknown operator '{s}'"),
                    fuzzy_match(s, &names),
                );
                None
            }
        },
        Some(other) => {
            result.error(
                operator_path,
                format!("must be a string, got {}", type_name(other)),
            );
            None
        }
    };

    let value_path = child(path, "value");
    let Some(value) = leaf.get("value") else {
        result.error(value_path, "required field is missing");
        return;
    };
    let Some(operator) = operator else {
        return;
    };

    match operator {
        ConditionOperator::In | ConditionOperator::NotIn => {
            if !value.is_array() {
                result.error(
                    value_path,
                    format!(
                        "operator '{operator}' requires a list value, got {}",
                        type_name(value)
                    ),
                );
            }
        }
        ConditionOperator::Between => match value.as_array() {
            Some(bounds) if bounds.len() == 2 => {
                if bounds.iter().any(|b| as_f64(b).is_none()) {
                    result.warn(value_path, "non-numeric between bounds never match");
                }
            }
            Some(bounds) => result.error(
                value_path,
                format!(
                    "operator 'between' requires a list of exactly 2 elements [low, high], got {}",
                    bounds.len()
                ),
            ),
            None => result.error(
                value_path,
                format!(
                    "operator 'between' requires a list of exactly 2 elements [low, high], got {}",
                    type_name(value)
                ),
            ),
        },
        op if op.is_ordering() && as_f64(value).is_none() => {
            result.warn(
                value_path,
                format!("operator '{op}' compares numbers but the value is a {}", type_name(value)),
            );
        }
        _ => {}
    }
}
