//! Executor behaviour: dispatch, failure isolation and history.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use verdict_actions::{
    ActionError, ActionExecutionError, ActionExecutor, ActionHandler, ActionOutcome, Notification,
    Notifier,
};
use verdict_rules::{
    Action, ActionInvocation, AuditLogger, Condition, ConditionGroup, ConditionOperator, Rule, RuleRuntime,
    TriggerResult,
};

fn invocation(rule_id: &str, action: Action) -> ActionInvocation {
    ActionInvocation {
        rule_id: rule_id.to_string(),
        rule_name: format!("Rule {rule_id}"),
        priority: 0,
        action_index: 0,
        action,
        prediction: json!({"asset_id": "pump-7", "predicted_value": 85, "confidence": 0.9})
            .as_object()
            .cloned()
            .unwrap(),
        triggered_at: Utc::now(),
    }
}

struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ActionHandler for CountingHandler {
    async fn handle(&self, _invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ActionOutcome::succeeded("counted"))
    }
}

struct FailingHandler;

#[async_trait::async_trait]
impl ActionHandler for FailingHandler {
    async fn handle(&self, _invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError> {
        Err(ActionError::Channel("downstream exploded".to_string()))
    }
}

struct PanickingHandler;

#[async_trait::async_trait]
impl ActionHandler for PanickingHandler {
    async fn handle(&self, _invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError> {
        panic!("handler bug");
    }
}

struct RecordingNotifier {
    sent: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), ActionError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

#[tokio::test]
async fn builtin_types_and_channels_are_registered() {
    let executor = ActionExecutor::new();
    assert_eq!(
        executor.registered_types(),
        vec!["alert", "notification", "webhook", "workorder"]
    );
    assert_eq!(executor.registered_channels(), vec!["email", "log", "sms"]);
}

#[tokio::test]
async fn webhook_without_url_fails_before_any_request() {
    let executor = ActionExecutor::new();
    let result = executor
        .execute(&invocation("r1", Action::new("webhook").with("method", json!("POST"))))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.action_type, "webhook");
    assert!(result.error.as_deref().unwrap().contains("url"));
    assert!(result.details.get("status_code").is_none());
}

#[tokio::test]
async fn notification_succeeds_when_any_channel_delivers() {
    let executor = ActionExecutor::new();
    let action = Action::new("notification").with("channels", json!(["email", "unregistered_channel"]));
    let result = executor.execute(&invocation("r1", action)).await.unwrap();

    assert!(result.success);
    let channels = result.details["channels"].as_array().unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0]["channel"], json!("email"));
    assert_eq!(channels[0]["success"], json!(true));
    assert_eq!(channels[1]["channel"], json!("unregistered_channel"));
    assert_eq!(channels[1]["success"], json!(false));
    assert_eq!(result.details["delivered"], json!(1));
    assert_eq!(result.details["failed"], json!(1));
}

#[tokio::test]
async fn notification_fails_when_no_channel_delivers() {
    let executor = ActionExecutor::new();
    let action = Action::new("notification").with("channels", json!(["pager", "fax"]));
    let result = executor.execute(&invocation("r1", action)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.details["delivered"], json!(0));
}

#[tokio::test]
async fn registered_channel_replaces_default() {
    let sent = Arc::new(AtomicUsize::new(0));
    let executor = ActionExecutor::new();
    executor.register_notification_handler("email", Arc::new(RecordingNotifier { sent: sent.clone() }));

    let action = Action::new("notification").with("channels", json!(["email"]));
    let result = executor.execute(&invocation("r1", action)).await.unwrap();
    assert!(result.success);
    assert_eq!(sent.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn batch_isolates_a_failing_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = ActionExecutor::empty(10);
    executor.register_handler("count", Arc::new(CountingHandler { calls: calls.clone() }));
    executor.register_handler("fail", Arc::new(FailingHandler));

    let results = executor
        .execute_batch(&[
            invocation("a", Action::new("count")),
            invocation("b", Action::new("fail")),
            invocation("c", Action::new("count")),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1].error.as_deref().unwrap().contains("downstream exploded"));
    assert!(results[2].success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let ids: Vec<&str> = results.iter().map(|r| r.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn panicking_handler_becomes_failed_result() {
    let executor = ActionExecutor::empty(10);
    executor.register_handler("boom", Arc::new(PanickingHandler));

    let result = executor.execute(&invocation("r1", Action::new("boom"))).await.unwrap();
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("handler bug"));
}

#[tokio::test]
async fn unregistered_type_is_a_failed_result() {
    let executor = ActionExecutor::new();
    let result = executor.execute(&invocation("r1", Action::new("jira"))).await.unwrap();
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("jira"));
}

#[tokio::test]
async fn structurally_invalid_invocations() {
    let executor = ActionExecutor::new();
    assert_eq!(
        executor.execute(&invocation("r1", Action::new(""))).await.unwrap_err(),
        ActionExecutionError::MissingActionType
    );
    assert!(matches!(
        executor.execute(&invocation("", Action::new("alert"))).await,
        Err(ActionExecutionError::MissingRuleId { .. })
    ));

    let results = executor
        .execute_batch(&[invocation("", Action::new("alert")), invocation("ok", Action::new("alert"))])
        .await;
    assert!(!results[0].success);
    assert!(results[1].success);
}

#[tokio::test]
async fn history_is_capped_and_newest_first() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = ActionExecutor::empty(3);
    executor.register_handler("count", Arc::new(CountingHandler { calls }));

    for i in 0..5 {
        executor.execute(&invocation(&format!("r{i}"), Action::new("count"))).await.unwrap();
    }

    assert_eq!(executor.history_len(), 3);
    let ids: Vec<String> = executor.history(10).into_iter().map(|r| r.rule_id).collect();
    assert_eq!(ids, vec!["r4", "r3", "r2"]);
    assert_eq!(executor.history(1).len(), 1);

    executor.clear_history();
    assert_eq!(executor.history_len(), 0);
}

#[tokio::test]
async fn runtime_invocations_flow_through_executor() {
    let runtime = RuleRuntime::new();
    runtime
        .add_rule(Rule::new(
            "hot",
            "Hot asset",
            ConditionGroup::all(vec![
                Condition::new("predicted_value", ConditionOperator::Gt, json!(80)).into(),
                Condition::new("confidence", ConditionOperator::Gte, json!(0.8)).into(),
            ]),
            vec![
                Action::new("alert").with("message", json!("{asset_id} reached {predicted_value}")),
                Action::new("workorder").with("priority", json!("high")),
            ],
        ))
        .unwrap();

    let prediction = invocation("unused", Action::new("alert")).prediction;
    let invocations = runtime.evaluate(&prediction);
    let results = ActionExecutor::new().execute_batch(&invocations).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(results[0].message, "pump-7 reached 85");
    assert!(results[1].details["ticket_id"].as_str().unwrap().starts_with("WO-"));
}

#[tokio::test]
async fn audited_batch_records_one_outcome_per_rule() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = ActionExecutor::empty(10);
    executor.register_handler("count", Arc::new(CountingHandler { calls }));
    executor.register_handler("fail", Arc::new(FailingHandler));
    let audit = AuditLogger::new();

    let results = executor
        .execute_audited(
            &[
                invocation("mixed", Action::new("count")),
                invocation("mixed", Action::new("fail")),
                invocation("broken", Action::new("fail")),
                invocation("clean", Action::new("count")),
            ],
            &audit,
        )
        .await;
    assert_eq!(results.len(), 4);

    let entries = audit.recent(10);
    let summary: Vec<(&str, TriggerResult)> = entries.iter().map(|e| (e.rule_id.as_str(), e.result)).collect();
    assert_eq!(
        summary,
        vec![
            ("clean", TriggerResult::Success),
            ("broken", TriggerResult::Failed),
            ("mixed", TriggerResult::Partial),
        ]
    );

    let mixed = &entries[2];
    assert_eq!(mixed.actions_executed, vec!["count", "fail"]);
    assert_eq!(mixed.error_message.as_deref(), Some("fail: Channel delivery failed: downstream exploded"));
    assert_eq!(mixed.duration_ms, Some(results[0].duration_ms + results[1].duration_ms));
    assert_eq!(mixed.asset_id.as_deref(), Some("pump-7"));
    assert!(entries[0].error_message.is_none());
}
