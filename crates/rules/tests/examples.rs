//! Integration tests that verify every example rule in `data/rules/examples/`
//! parses and behaves as documented.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use verdict_rules::store::load_file;
use verdict_rules::{
    ConditionNode, ConditionOperator, FileRuleStore, LogicalOperator, Rule, RuleParser,
    RuleRuntime, RuleStore,
};

/// Integration tests run from the crate directory, so go up two levels.
fn examples_dir() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/rules/examples")
}

fn load_rules(filename: &str) -> Vec<Rule> {
    let path = examples_dir().join(filename);
    let parser = RuleParser::new();
    load_file(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
        .iter()
        .map(|dsl| {
            parser
                .parse(dsl)
                .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e))
        })
        .collect()
}

fn record(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

// ── high-temperature.yml ────────────────────────────────────

#[test]
fn parse_high_temperature_example() {
    let rules = load_rules("high-temperature.yml");
    assert_eq!(rules.len(), 1);
    let rule = &rules[0];

    assert_eq!(rule.rule_id, "high-temperature");
    assert_eq!(rule.priority, 10);
    assert_eq!(rule.cooldown_seconds, 900);
    assert_eq!(rule.model_id, Some(3));
    assert_eq!(rule.conditions.logic, LogicalOperator::And);
    assert_eq!(rule.action_types(), vec!["alert", "notification"]);
    assert_eq!(
        rule.actions[1].config_str_list("channels"),
        Some(vec!["email".to_string(), "sms".to_string()])
    );
}

// ── maintenance-window.json ─────────────────────────────────

#[test]
fn parse_maintenance_window_example() {
    let rules = load_rules("maintenance-window.json");
    let rule = &rules[0];

    assert_eq!(rule.category_id, Some(2));
    match &rule.conditions.rules[0] {
        ConditionNode::Leaf(c) => {
            assert_eq!(c.operator, ConditionOperator::Between);
            assert_eq!(c.value, json!([0, 14]));
        }
        other => panic!("expected leaf, got {other:?}"),
    }
    assert!(matches!(&rule.conditions.rules[1], ConditionNode::Group(g) if g.logic == LogicalOperator::Or));

    // Nested `config` is flattened by the parser.
    assert_eq!(rule.actions[1].config_str("url"), Some("${CMMS_WEBHOOK_URL}"));
    assert_eq!(rule.actions[1].config_u64("timeout_seconds"), Some(10));
}

// ── vibration.yaml ──────────────────────────────────────────

#[test]
fn parse_vibration_list_example() {
    let rules = load_rules("vibration.yaml");
    let ids: Vec<&str> = rules.iter().map(|r| r.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["vibration-warning", "vibration-legacy"]);
    assert!(rules[0].enabled);
    assert!(!rules[1].enabled);
}

// ── whole directory ─────────────────────────────────────────

#[test]
fn example_directory_loads_enabled_rules() {
    let store = FileRuleStore::new(examples_dir());
    assert_eq!(store.fetch_enabled_rules().unwrap().len(), 3);

    let runtime = RuleRuntime::new();
    let results = runtime.load_from_store(&store).unwrap();
    assert!(results.iter().all(|r| r.is_loaded()), "{results:?}");

    let order: Vec<String> = runtime.rules().into_iter().map(|r| r.rule_id).collect();
    assert_eq!(order, vec!["high-temperature", "vibration-warning", "maintenance-window"]);
}

#[test]
fn example_rules_trigger_on_matching_predictions() {
    let runtime = RuleRuntime::new();
    runtime.load_from_store(&FileRuleStore::new(examples_dir())).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap();

    let prediction = record(json!({
        "model_id": 3,
        "category_id": 2,
        "asset_id": "pump-7",
        "asset_class": "pump",
        "predicted_value": 88.5,
        "confidence": 0.93,
        "predicted_rms_velocity": 5.2,
        "status": "running",
        "remaining_useful_life_days": 9
    }));

    let invocations = runtime.evaluate_at(&prediction, now);
    let fired: Vec<(&str, &str)> = invocations
        .iter()
        .map(|i| (i.rule_id.as_str(), i.action_type()))
        .collect();
    assert_eq!(
        fired,
        vec![
            ("high-temperature", "alert"),
            ("high-temperature", "notification"),
            ("vibration-warning", "alert"),
            ("maintenance-window", "workorder"),
            ("maintenance-window", "webhook"),
        ]
    );

    // Every example rule has a cooldown, so an immediate repeat is silent.
    assert!(runtime.evaluate_at(&prediction, now).is_empty());
}
