//! Rule DSL parser: validation, typed conversion and serialization.
//!
//! The DSL is an untyped nested map (JSON or YAML). [`RuleParser::validate`]
//! walks it and accumulates *every* violation; [`RuleParser::parse`] turns a
//! valid map into a [`Rule`]; [`serialize`] goes back the other way so that
//! `parse(serialize(parse(x))) == parse(x)`.

mod action_checks;
mod condition_checks;
pub(crate) mod fuzzy;
mod rule_checks;
mod validation;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RuleParseError;
use crate::model::{action_types, Rule};

pub use validation::{ValidationError, ValidationResult, ValidationWarning};

/// Default ceiling on condition-group nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Validates and converts rule DSL maps.
///
/// Knows the built-in action types plus any custom types registered with
/// [`register_action_type`](RuleParser::register_action_type); actions of any
/// other type are rejected.
#[derive(Debug, Clone)]
pub struct RuleParser {
    action_types: BTreeSet<String>,
    max_depth: usize,
}

impl RuleParser {
    /// Parser that accepts the built-in action types.
    pub fn new() -> Self {
        Self {
            action_types: action_types::BUILTIN.iter().map(|t| t.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.register_action_type(action_type);
        self
    }

    /// Accept actions of a custom type.
    pub fn register_action_type(&mut self, action_type: impl Into<String>) {
        self.action_types.insert(action_type.into());
    }

    /// Accepted action types, sorted.
    pub fn action_types(&self) -> impl Iterator<Item = &str> {
        self.action_types.iter().map(String::as_str)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Check a DSL map, collecting all errors and warnings.
    pub fn validate(&self, dsl: &Value) -> ValidationResult {
        let normalized = normalize(dsl);
        self.validate_normalized(&normalized)
    }

    /// Validate an already-typed rule, e.g. one built in code.
    pub fn validate_rule(&self, rule: &Rule) -> ValidationResult {
        self.validate_normalized(&serialize(rule))
    }

    /// Validate and convert a DSL map into a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`RuleParseError`] listing every validation error.
    pub fn parse(&self, dsl: &Value) -> Result<Rule, RuleParseError> {
        let normalized = normalize(dsl);
        let result = self.validate_normalized(&normalized);
        let rule_id = normalized
            .get("rule_id")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        if !result.valid {
            return Err(RuleParseError::new(rule_id, result.messages()));
        }

        for warning in &result.warnings {
            debug!(
                rule_id = rule_id.as_deref().unwrap_or(""),
                path = %warning.path,
                "{}",
                warning.message
            );
        }

        serde_json::from_value(normalized)
            .map_err(|e| RuleParseError::new(rule_id, vec![e.to_string()]))
    }

    fn validate_normalized(&self, dsl: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(map) = dsl.as_object() else {
            result.error("", "rule definition must be a mapping");
            return result;
        };

        rule_checks::validate_required(map, &mut result);
        rule_checks::validate_identity(map, &mut result);
        rule_checks::validate_flags(map, &mut result);
        if let Some(conditions) = map.get("conditions") {
            condition_checks::validate_root(conditions, self.max_depth, &mut result);
        }
        if let Some(actions) = map.get("actions") {
            let known: Vec<&str> = self.action_types().collect();
            action_checks::validate_actions(actions, &known, &mut result);
        }
        rule_checks::warn_unknown_fields(map, &mut result);
        result
    }
}

impl Default for RuleParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a rule back into its DSL map.
///
/// Actions are written flat, except when their config has its own `config`
/// object: those keep the `{"type": ..., "config": {...}}` form so that
/// parsing doesn't unwrap the inner object.
pub fn serialize(rule: &Rule) -> Value {
    // Rule's serde form is the DSL; only non-string map keys could fail and
    // the model has none.
    let mut dsl = serde_json::to_value(rule).unwrap_or_else(|_| Value::Object(Map::new()));
    if let Some(actions) = dsl.get_mut("actions").and_then(Value::as_array_mut) {
        for (action, model) in actions.iter_mut().zip(&rule.actions) {
            if matches!(model.config.get("config"), Some(Value::Object(_))) {
                let mut wrapped = Map::new();
                wrapped.insert("type".to_string(), Value::String(model.action_type.clone()));
                wrapped.insert("config".to_string(), Value::Object(model.config.clone()));
                *action = Value::Object(wrapped);
            }
        }
    }
    dsl
}

/// Rewrite accepted alternate spellings into the canonical DSL form.
///
/// Actions written as `{"type": ..., "config": {...}}` are flattened to
/// `{"type": ..., ...config}`.
fn normalize(dsl: &Value) -> Value {
    let mut dsl = dsl.clone();
    if let Some(actions) = dsl.get_mut("actions").and_then(Value::as_array_mut) {
        for action in actions.iter_mut() {
            let Some(map) = action.as_object_mut() else {
                continue;
            };
            if !matches!(map.get("config"), Some(Value::Object(_))) {
                continue;
            }
            if let Some(Value::Object(config)) = map.remove("config") {
                for (key, value) in config {
                    if key != "type" {
                        map.entry(key).or_insert(value);
                    }
                }
            }
        }
    }
    dsl
}
