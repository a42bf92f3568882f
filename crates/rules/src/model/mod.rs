//! Typed rule model: [`Rule`], its condition tree and its actions.
//!
//! The serde representation of these types *is* the rule DSL, so
//! `serde_json::to_value(&rule)` yields a map the parser accepts again.

mod action;
mod condition;

pub use action::{action_types, Action};
pub use condition::{Condition, ConditionGroup, ConditionNode, ConditionOperator, LogicalOperator};

use serde::{Deserialize, Serialize};

/// Largest accepted `cooldown_seconds` (100 years of 365 days).
pub const MAX_COOLDOWN_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

fn default_enabled() -> bool {
    true
}

/// One decision rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower values are evaluated first.
    #[serde(default)]
    pub priority: i64,
    pub conditions: ConditionGroup,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub cooldown_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<i64>,
}

impl Rule {
    /// Enabled rule with priority 0 and no cooldown or scoping.
    pub fn new(
        rule_id: impl Into<String>,
        name: impl Into<String>,
        conditions: ConditionGroup,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            name: name.into(),
            description: None,
            enabled: true,
            priority: 0,
            conditions,
            actions,
            cooldown_seconds: 0,
            category_id: None,
            model_id: None,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    pub fn with_model(mut self, model_id: i64) -> Self {
        self.model_id = Some(model_id);
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Action type names in declaration order.
    pub fn action_types(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.action_type.clone()).collect()
    }
}
