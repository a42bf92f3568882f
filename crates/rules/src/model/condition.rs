//! Condition tree: leaf comparisons combined by AND/OR groups.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a leaf [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Between,
    Contains,
    StartsWith,
    EndsWith,
}

impl ConditionOperator {
    pub const ALL: [ConditionOperator; 12] = [
        ConditionOperator::Eq,
        ConditionOperator::Ne,
        ConditionOperator::Gt,
        ConditionOperator::Gte,
        ConditionOperator::Lt,
        ConditionOperator::Lte,
        ConditionOperator::In,
        ConditionOperator::NotIn,
        ConditionOperator::Between,
        ConditionOperator::Contains,
        ConditionOperator::StartsWith,
        ConditionOperator::EndsWith,
    ];

    /// DSL spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Eq => "eq",
            ConditionOperator::Ne => "ne",
            ConditionOperator::Gt => "gt",
            ConditionOperator::Gte => "gte",
            ConditionOperator::Lt => "lt",
            ConditionOperator::Lte => "lte",
            ConditionOperator::In => "in",
            ConditionOperator::NotIn => "not_in",
            ConditionOperator::Between => "between",
            ConditionOperator::Contains => "contains",
            ConditionOperator::StartsWith => "starts_with",
            ConditionOperator::EndsWith => "ends_with",
        }
    }

    /// Look up an operator by its DSL spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == name)
    }

    /// Operators whose `value` must be a list.
    pub fn expects_list(&self) -> bool {
        matches!(
            self,
            ConditionOperator::In | ConditionOperator::NotIn | ConditionOperator::Between
        )
    }

    /// Operators that compare numerically.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ConditionOperator::Gt
                | ConditionOperator::Gte
                | ConditionOperator::Lt
                | ConditionOperator::Lte
                | ConditionOperator::Between
        )
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a [`ConditionGroup`] combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AND" => Some(LogicalOperator::And),
            "OR" => Some(LogicalOperator::Or),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf comparison of one prediction field against a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// AND/OR combination of conditions and nested groups. `rules` is never empty
/// once a rule has passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(rename = "type")]
    pub logic: LogicalOperator,
    pub rules: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn new(logic: LogicalOperator, rules: Vec<ConditionNode>) -> Self {
        Self { logic, rules }
    }

    /// Group satisfied when every child is.
    pub fn all(rules: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::And, rules)
    }

    /// Group satisfied when any child is.
    pub fn any(rules: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Or, rules)
    }

    /// Nesting depth, counting this group as 1.
    pub fn depth(&self) -> usize {
        1 + self
            .rules
            .iter()
            .map(|node| match node {
                ConditionNode::Group(group) => group.depth(),
                ConditionNode::Leaf(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

/// A node of the condition tree.
///
/// In the DSL a node is a group exactly when it carries a `rules` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Group(ConditionGroup),
    Leaf(Condition),
}

impl From<Condition> for ConditionNode {
    fn from(condition: Condition) -> Self {
        ConditionNode::Leaf(condition)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        ConditionNode::Group(group)
    }
}
