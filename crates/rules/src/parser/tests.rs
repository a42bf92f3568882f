//! Tests for DSL validation, parsing and serialization.

use serde_json::{json, Value};

use super::*;
use crate::model::{ConditionNode, ConditionOperator, LogicalOperator, MAX_COOLDOWN_SECONDS};

fn valid_dsl() -> Value {
    json!({
        "rule_id": "high-temp",
        "name": "High temperature",
        "description": "Predicted temperature above threshold",
        "priority": 5,
        "cooldown_seconds": 300,
        "model_id": 12,
        "conditions": {
            "type": "AND",
            "rules": [
                {"field": "predicted_value", "operator": "gt", "value": 80},
                {"field": "confidence", "operator": "gte", "value": 0.8},
                {
                    "type": "OR",
                    "rules": [
                        {"field": "zone", "operator": "in", "value": ["A", "B"]},
                        {"field": "pressure", "operator": "between", "value": [1.0, 2.5]}
                    ]
                }
            ]
        },
        "actions": [
            {"type": "alert", "severity": "critical", "message": "Temp {predicted_value}"},
            {"type": "notification", "channels": ["email", "sms"]},
            {"type": "webhook", "url": "https://hooks.example.com/t", "method": "PUT"},
            {"type": "workorder", "priority": "high"}
        ]
    })
}

fn error_paths(result: &ValidationResult) -> Vec<&str> {
    result.errors.iter().map(|e| e.path.as_str()).collect()
}

// ── validate ────────────────────────────────────────────────────────

#[test]
fn valid_rule_passes() {
    let result = RuleParser::new().validate(&valid_dsl());
    assert!(result.valid, "unexpected errors: {:?}", result.messages());
    assert!(result.errors.is_empty());
}

#[test]
fn missing_required_fields_are_all_reported() {
    let result = RuleParser::new().validate(&json!({"enabled": true}));
    assert!(!result.valid);
    let paths = error_paths(&result);
    for field in ["rule_id", "name", "conditions", "actions"] {
        assert!(paths.contains(&field), "missing error for {field}: {paths:?}");
    }
}

#[test]
fn non_mapping_is_rejected() {
    let result = RuleParser::new().validate(&json!(["not", "a", "rule"]));
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn type_checks_on_top_level_fields() {
    let mut dsl = valid_dsl();
    dsl["enabled"] = json!("yes");
    dsl["priority"] = json!(1.5);
    dsl["cooldown_seconds"] = json!(-10);
    dsl["model_id"] = json!("twelve");
    dsl["name"] = json!("   ");

    let result = RuleParser::new().validate(&dsl);
    let paths = error_paths(&result);
    assert_eq!(result.errors.len(), 5, "{:?}", result.messages());
    for field in ["enabled", "priority", "cooldown_seconds", "model_id", "name"] {
        assert!(paths.contains(&field), "missing error for {field}");
    }
}

#[test]
fn cooldown_beyond_the_representable_window_is_rejected() {
    let mut dsl = valid_dsl();
    dsl["cooldown_seconds"] = json!(9_000_000_000_000u64);
    let result = RuleParser::new().validate(&dsl);
    assert!(!result.valid);
    assert_eq!(error_paths(&result), vec!["cooldown_seconds"]);

    dsl["cooldown_seconds"] = json!(MAX_COOLDOWN_SECONDS);
    assert!(RuleParser::new().validate(&dsl).valid);
}

#[test]
fn condition_errors_accumulate_with_paths() {
    let mut dsl = valid_dsl();
    dsl["conditions"] = json!({
        "type": "XOR",
        "rules": [
            {"field": "a", "operator": "betwen", "value": [1, 2]},
            {"field": "b", "operator": "in", "value": "x"},
            {"field": "c", "operator": "between", "value": [1, 2, 3]},
            {"operator": "eq", "value": 1},
            {"type": "OR", "rules": []},
            {"field": "d", "operator": "eq"}
        ]
    });

    let result = RuleParser::new().validate(&dsl);
    let paths = error_paths(&result);
    assert_eq!(
        paths,
        vec![
            "conditions.type",
            "conditions.rules[0].operator",
            "conditions.rules[1].value",
            "conditions.rules[2].value",
            "conditions.rules[3].field",
            "conditions.rules[4].rules",
            "conditions.rules[5].value",
        ]
    );
    assert_eq!(result.errors[1].suggestion.as_deref(), Some("between"));
}

#[test]
fn lowercase_logical_operator_gets_suggestion() {
    let mut dsl = valid_dsl();
    dsl["conditions"]["type"] = json!("and");
    let result = RuleParser::new().validate(&dsl);
    assert!(!result.valid);
    assert_eq!(result.errors[0].suggestion.as_deref(), Some("AND"));
    assert!(result.messages()[0].contains("did you mean 'AND'?"));
}

#[test]
fn root_conditions_must_be_a_group() {
    let mut dsl = valid_dsl();
    dsl["conditions"] = json!({"field": "x", "operator": "eq", "value": 1});
    let result = RuleParser::new().validate(&dsl);
    assert_eq!(error_paths(&result), vec!["conditions"]);
}

#[test]
fn depth_limit_is_enforced() {
    let mut node = json!({"field": "x", "operator": "eq", "value": 1});
    for _ in 0..5 {
        node = json!({"type": "AND", "rules": [node]});
    }
    let mut dsl = valid_dsl();
    dsl["conditions"] = node;

    assert!(RuleParser::new().with_max_depth(5).validate(&dsl).valid);
    let result = RuleParser::new().with_max_depth(4).validate(&dsl);
    assert!(!result.valid);
    assert!(result.messages()[0].contains("maximum of 4"));
}

#[test]
fn action_errors_accumulate() {
    let mut dsl = valid_dsl();
    dsl["actions"] = json!([
        {"type": "notification"},
        {"type": "notification", "channels": "email"},
        {"type": "webhook"},
        {"type": "webhook", "url": "https://x", "method": "FETCH"},
        {"type": "alrt"},
        {"severity": "high"},
        "alert"
    ]);

    let result = RuleParser::new().validate(&dsl);
    assert_eq!(
        error_paths(&result),
        vec![
            "actions[0].channels",
            "actions[1].channels",
            "actions[2].url",
            "actions[3].method",
            "actions[4].type",
            "actions[5].type",
            "actions[6]",
        ]
    );
    assert_eq!(result.errors[4].suggestion.as_deref(), Some("alert"));
}

#[test]
fn empty_action_list_is_rejected() {
    let mut dsl = valid_dsl();
    dsl["actions"] = json!([]);
    let result = RuleParser::new().validate(&dsl);
    assert_eq!(error_paths(&result), vec!["actions"]);
}

#[test]
fn custom_action_types_need_registration() {
    let mut dsl = valid_dsl();
    dsl["actions"] = json!([{"type": "jira", "project": "OPS"}]);

    assert!(!RuleParser::new().validate(&dsl).valid);
    let parser = RuleParser::new().with_action_type("jira");
    assert!(parser.validate(&dsl).valid);
    assert!(parser.action_types().any(|t| t == "jira"));
}

#[test]
fn unknown_top_level_fields_only_warn() {
    let mut dsl = valid_dsl();
    dsl["priorty"] = json!(3);
    let result = RuleParser::new().validate(&dsl);
    assert!(result.valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("priority"));
}

// ── parse ───────────────────────────────────────────────────────────

#[test]
fn parse_builds_typed_tree() {
    let rule = RuleParser::new().parse(&valid_dsl()).unwrap();

    assert_eq!(rule.rule_id, "high-temp");
    assert!(rule.enabled);
    assert_eq!(rule.priority, 5);
    assert_eq!(rule.cooldown_seconds, 300);
    assert_eq!(rule.model_id, Some(12));
    assert_eq!(rule.category_id, None);
    assert_eq!(rule.conditions.logic, LogicalOperator::And);
    assert_eq!(rule.conditions.rules.len(), 3);

    match &rule.conditions.rules[0] {
        ConditionNode::Leaf(c) => {
            assert_eq!(c.field, "predicted_value");
            assert_eq!(c.operator, ConditionOperator::Gt);
            assert_eq!(c.value, json!(80));
        }
        other => panic!("expected leaf, got {other:?}"),
    }
    match &rule.conditions.rules[2] {
        ConditionNode::Group(g) => {
            assert_eq!(g.logic, LogicalOperator::Or);
            assert_eq!(g.rules.len(), 2);
        }
        other => panic!("expected group, got {other:?}"),
    }

    assert_eq!(
        rule.action_types(),
        vec!["alert", "notification", "webhook", "workorder"]
    );
    assert_eq!(rule.actions[2].config_str("method"), Some("PUT"));
}

#[test]
fn parse_applies_defaults() {
    let rule = RuleParser::new()
        .parse(&json!({
            "rule_id": "r",
            "name": "R",
            "conditions": {"type": "OR", "rules": [{"field": "x", "operator": "eq", "value": 1}]},
            "actions": [{"type": "alert"}]
        }))
        .unwrap();
    assert!(rule.enabled);
    assert_eq!(rule.priority, 0);
    assert_eq!(rule.cooldown_seconds, 0);
    assert!(rule.description.is_none());
}

#[test]
fn parse_error_aggregates_every_violation() {
    let mut dsl = valid_dsl();
    dsl["priority"] = json!("high");
    dsl["actions"] = json!([{"type": "webhook"}]);
    dsl["conditions"]["rules"][0]["operator"] = json!("greater");

    let err = RuleParser::new().parse(&dsl).unwrap_err();
    assert_eq!(err.rule_id.as_deref(), Some("high-temp"));
    assert_eq!(err.errors.len(), 3, "{:?}", err.errors);

    let rendered = err.to_string();
    assert!(rendered.starts_with("invalid rule 'high-temp'"));
    assert!(rendered.contains("priority"));
    assert!(rendered.contains("actions[0].url"));
    assert!(rendered.contains("conditions.rules[0].operator"));
}

#[test]
fn nested_action_config_is_flattened() {
    let mut dsl = valid_dsl();
    dsl["actions"] = json!([
        {"type": "webhook", "config": {"url": "https://hooks.example.com", "timeout_seconds": 5}}
    ]);

    let rule = RuleParser::new().parse(&dsl).unwrap();
    assert_eq!(rule.actions[0].config_str("url"), Some("https://hooks.example.com"));
    assert_eq!(rule.actions[0].config_u64("timeout_seconds"), Some(5));
    assert!(rule.actions[0].config_value("config").is_none());
}

// ── serialize ───────────────────────────────────────────────────────

#[test]
fn round_trip_is_stable() {
    let parser = RuleParser::new();
    let samples = vec![
        valid_dsl(),
        json!({
            "rule_id": "minimal",
            "name": "Minimal",
            "enabled": false,
            "conditions": {"type": "OR", "rules": [{"field": "s", "operator": "contains", "value": "err"}]},
            "actions": [{"type": "alert", "config": {"message": "m"}}]
        }),
        json!({
            "rule_id": "nested-config",
            "name": "Nested config",
            "conditions": {"type": "AND", "rules": [{"field": "x", "operator": "eq", "value": 1}]},
            "actions": [
                {"type": "alert", "config": {"config": {"k": 1}, "message": "m"}},
                {"type": "alert", "config": {"config": {"k": 2}}}
            ]
        }),
    ];

    for dsl in samples {
        let first = parser.parse(&dsl).unwrap();
        let second = parser.parse(&serialize(&first)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn inner_config_object_survives_round_trip() {
    let parser = RuleParser::new();
    let mut dsl = valid_dsl();
    dsl["actions"] = json!([{"type": "alert", "config": {"config": {"k": 1}, "message": "m"}}]);

    let first = parser.parse(&dsl).unwrap();
    assert_eq!(first.actions[0].config_value("config"), Some(&json!({"k": 1})));
    assert_eq!(first.actions[0].config_str("message"), Some("m"));

    let emitted = serialize(&first);
    assert_eq!(emitted["actions"][0]["config"]["config"], json!({"k": 1}));

    let second = parser.parse(&emitted).unwrap();
    assert_eq!(second.actions[0], first.actions[0]);
    assert!(second.actions[0].config_value("k").is_none());
}

#[test]
fn serialize_emits_flat_dsl() {
    let rule = RuleParser::new().parse(&valid_dsl()).unwrap();
    let dsl = serialize(&rule);

    assert_eq!(dsl["rule_id"], json!("high-temp"));
    assert_eq!(dsl["conditions"]["type"], json!("AND"));
    assert_eq!(dsl["conditions"]["rules"][0]["operator"], json!("gt"));
    assert_eq!(dsl["actions"][1]["channels"], json!(["email", "sms"]));
    assert!(dsl.get("category_id").is_none());
}

#[test]
fn validate_rule_catches_programmatic_mistakes() {
    let mut rule = RuleParser::new().parse(&valid_dsl()).unwrap();
    rule.conditions.rules.clear();
    rule.actions.clear();

    let result = RuleParser::new().validate_rule(&rule);
    assert_eq!(error_paths(&result), vec!["conditions.rules", "actions"]);
}
