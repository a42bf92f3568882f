//! Condition tree evaluation against a prediction record.
//!
//! A leaf that cannot be evaluated (wrong operand types, malformed bounds) is
//! logged and counts as `false`; it never aborts the surrounding tree.

use serde_json::Value;
use tracing::warn;
use verdict_core::{as_f64, stringify, values_equal, PredictionRecord};

use crate::error::ConditionError;
use crate::model::{Condition, ConditionGroup, ConditionNode, ConditionOperator, LogicalOperator};

/// Evaluate a group: AND = every child, OR = any child.
pub(crate) fn evaluate_group(group: &ConditionGroup, record: &PredictionRecord, rule_id: &str) -> bool {
    match group.logic {
        LogicalOperator::And => group
            .rules
            .iter()
            .all(|node| evaluate_node(node, record, rule_id)),
        LogicalOperator::Or => group
            .rules
            .iter()
            .any(|node| evaluate_node(node, record, rule_id)),
    }
}

fn evaluate_node(node: &ConditionNode, record: &PredictionRecord, rule_id: &str) -> bool {
    match node {
        ConditionNode::Group(group) => evaluate_group(group, record, rule_id),
        ConditionNode::Leaf(condition) => {
            let Some(actual) = record.get(&condition.field) else {
                return false;
            };
            match evaluate_leaf(condition, actual) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(
                        rule_id,
                        field = %condition.field,
                        operator = %condition.operator,
                        error = %e,
                        "condition evaluation failed, treating as false"
                    );
                    false
                }
            }
        }
    }
}

/// Compare one record value against a leaf condition.
pub(crate) fn evaluate_leaf(condition: &Condition, actual: &Value) -> Result<bool, ConditionError> {
    let op = condition.operator;
    let expected = &condition.value;

    match op {
        ConditionOperator::Eq => Ok(values_equal(actual, expected)),
        ConditionOperator::Ne => Ok(!values_equal(actual, expected)),
        ConditionOperator::Gt => compare(op, actual, expected, |a, b| a > b),
        ConditionOperator::Gte => compare(op, actual, expected, |a, b| a >= b),
        ConditionOperator::Lt => compare(op, actual, expected, |a, b| a < b),
        ConditionOperator::Lte => compare(op, actual, expected, |a, b| a <= b),
        ConditionOperator::In => Ok(list(op, expected)?.iter().any(|v| values_equal(actual, v))),
        ConditionOperator::NotIn => Ok(!list(op, expected)?.iter().any(|v| values_equal(actual, v))),
        ConditionOperator::Between => {
            let bounds = list(op, expected)?;
            let [low, high] = bounds.as_slice() else {
                return Err(ConditionError::BetweenBounds { count: bounds.len() });
            };
            let value = number(op, "field value", actual)?;
            let low = number(op, "lower bound", low)?;
            let high = number(op, "upper bound", high)?;
            Ok(low <= value && value <= high)
        }
        ConditionOperator::Contains => Ok(stringify(actual).contains(&stringify(expected))),
        ConditionOperator::StartsWith => Ok(stringify(actual).starts_with(&stringify(expected))),
        ConditionOperator::EndsWith => Ok(stringify(actual).ends_with(&stringify(expected))),
    }
}

fn compare(
    op: ConditionOperator,
    actual: &Value,
    expected: &Value,
    cmp: impl Fn(f64, f64) -> bool,
) -> Result<bool, ConditionError> {
    let a = number(op, "field value", actual)?;
    let b = number(op, "threshold", expected)?;
    Ok(cmp(a, b))
}

fn number(op: ConditionOperator, side: &'static str, value: &Value) -> Result<f64, ConditionError> {
    as_f64(value).ok_or_else(|| ConditionError::NotNumeric {
        operator: op.as_str(),
        side,
        value: value.to_string(),
    })
}

fn list(op: ConditionOperator, value: &Value) -> Result<&Vec<Value>, ConditionError> {
    value.as_array().ok_or_else(|| ConditionError::ExpectedList {
        operator: op.as_str(),
        value: value.to_string(),
    })
}
