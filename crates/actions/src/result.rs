//! Handler outcomes and the per-invocation result the executor reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use verdict_rules::{TriggerOutcome, TriggerResult};

/// What a handler reports back for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub details: Map<String, Value>,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: Map::new(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: Map::new(),
            error: Some(error.into()),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Result of executing one action invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action_type: String,
    pub rule_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ActionResult {
    pub(crate) fn from_outcome(
        action_type: &str,
        rule_id: &str,
        outcome: ActionOutcome,
        executed_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            success: outcome.success,
            action_type: action_type.to_string(),
            rule_id: rule_id.to_string(),
            message: outcome.message,
            details: outcome.details,
            error: outcome.error,
            executed_at,
            duration_ms,
        }
    }

    pub(crate) fn failure(
        action_type: &str,
        rule_id: &str,
        error: impl Into<String>,
        executed_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        let error = error.into();
        Self {
            success: false,
            action_type: action_type.to_string(),
            rule_id: rule_id.to_string(),
            message: format!("{action_type} action failed"),
            details: Map::new(),
            error: Some(error),
            executed_at,
            duration_ms,
        }
    }
}

/// Audit outcome of one rule trigger, from the results of its actions.
///
/// Failures are reported as `"<action_type>: <error>"`, joined with `"; "`.
pub fn trigger_outcome(results: &[&ActionResult]) -> TriggerOutcome {
    let executed = results.iter().map(|r| r.action_type.clone()).collect();
    let duration_ms = results.iter().map(|r| r.duration_ms).sum();
    let errors: Vec<String> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| format!("{}: {}", r.action_type, r.error.as_deref().unwrap_or(&r.message)))
        .collect();

    let outcome = TriggerOutcome::success(executed).with_duration(duration_ms);
    if errors.is_empty() {
        return outcome;
    }
    let result = TriggerResult::from_counts(results.len() - errors.len(), errors.len());
    outcome.with_error(result, errors.join("; "))
}
