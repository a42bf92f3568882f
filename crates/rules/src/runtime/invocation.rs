//! The unit of work handed from the runtime to the action executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verdict_core::PredictionRecord;

use crate::model::{Action, Rule};

/// A matched rule's action paired with the prediction that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInvocation {
    pub rule_id: String,
    pub rule_name: String,
    pub priority: i64,
    /// Position of `action` within the rule's action list.
    pub action_index: usize,
    pub action: Action,
    pub prediction: PredictionRecord,
    pub triggered_at: DateTime<Utc>,
}

impl ActionInvocation {
    /// One invocation per action of `rule`, in declaration order.
    pub fn for_rule(
        rule: &Rule,
        prediction: &PredictionRecord,
        triggered_at: DateTime<Utc>,
    ) -> Vec<Self> {
        rule.actions
            .iter()
            .enumerate()
            .map(|(action_index, action)| Self {
                rule_id: rule.rule_id.clone(),
                rule_name: rule.name.clone(),
                priority: rule.priority,
                action_index,
                action: action.clone(),
                prediction: prediction.clone(),
                triggered_at,
            })
            .collect()
    }

    pub fn action_type(&self) -> &str {
        &self.action.action_type
    }
}
