//! Dispatches action invocations to handlers by action type.
//!
//! Every handler call runs on its own tokio task so that a slow or panicking
//! handler only affects its own invocation. Handler errors and panics become
//! failed [`ActionResult`]s; `execute` only returns `Err` for structurally
//! invalid invocations.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};
use verdict_core::config::ActionsConfig;
use verdict_rules::model::action_types;
use verdict_rules::{ActionInvocation, AuditLogger};

use crate::channels::ChannelRegistry;
use crate::error::ActionExecutionError;
use crate::handlers::{AlertHandler, NotificationHandler, WebhookHandler, WebhookSettings, WorkOrderHandler};
use crate::result::{trigger_outcome, ActionResult};
use crate::traits::{ActionHandler, AlarmStore, Notifier, TicketingClient};

/// Default number of results kept in the execution history.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Executor-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub history_limit: usize,
    pub webhook: WebhookSettings,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            webhook: WebhookSettings::default(),
        }
    }
}

impl ExecutorSettings {
    pub fn from_config(config: &ActionsConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            webhook: WebhookSettings::from_config(config),
        }
    }
}

pub struct ActionExecutor {
    handlers: RwLock<HashMap<String, Arc<dyn ActionHandler>>>,
    channels: Arc<ChannelRegistry>,
    history: Mutex<VecDeque<ActionResult>>,
    history_limit: usize,
}

impl ActionExecutor {
    /// Executor with the built-in handlers and default settings.
    pub fn new() -> Self {
        Self::with_settings(ExecutorSettings::default())
    }

    pub fn from_config(config: &ActionsConfig) -> Self {
        Self::with_settings(ExecutorSettings::from_config(config))
    }

    /// Executor with the built-in handlers and the default log-backed
    /// notification channels.
    pub fn with_settings(settings: ExecutorSettings) -> Self {
        let executor = Self {
            handlers: RwLock::new(HashMap::new()),
            channels: Arc::new(ChannelRegistry::with_defaults()),
            history: Mutex::new(VecDeque::new()),
            history_limit: settings.history_limit.max(1),
        };
        executor.register_handler(action_types::ALERT, Arc::new(AlertHandler::new()));
        executor.register_handler(
            action_types::NOTIFICATION,
            Arc::new(NotificationHandler::new(Arc::clone(&executor.channels))),
        );
        executor.register_handler(action_types::WEBHOOK, Arc::new(WebhookHandler::new(settings.webhook)));
        executor.register_handler(action_types::WORKORDER, Arc::new(WorkOrderHandler::new()));
        executor
    }

    /// Executor with no handlers and no channels.
    pub fn empty(history_limit: usize) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            channels: Arc::new(ChannelRegistry::new()),
            history: Mutex::new(VecDeque::new()),
            history_limit: history_limit.max(1),
        }
    }

    /// Persist alerts to `store`.
    pub fn with_alarm_store(self, store: Arc<dyn AlarmStore>) -> Self {
        self.register_handler(action_types::ALERT, Arc::new(AlertHandler::new().with_alarm_store(store)));
        self
    }

    /// Forward work orders to `client`.
    pub fn with_ticketing(self, client: Arc<dyn TicketingClient>) -> Self {
        self.register_handler(action_types::WORKORDER, Arc::new(WorkOrderHandler::new().with_ticketing(client)));
        self
    }

    // ── Registration ────────────────────────────────────────────────

    /// Add or replace the handler for `action_type`.
    pub fn register_handler(&self, action_type: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        let action_type = action_type.into();
        info!(action_type = %action_type, "action handler registered");
        self.handlers
            .write()
            .expect("handlers lock poisoned")
            .insert(action_type, handler);
    }

    /// Add or replace the notifier behind a notification channel.
    pub fn register_notification_handler(&self, channel: impl Into<String>, notifier: Arc<dyn Notifier>) {
        self.channels.register(channel, notifier);
    }

    pub fn channels(&self) -> Arc<ChannelRegistry> {
        Arc::clone(&self.channels)
    }

    /// Registered action types, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .handlers
            .read()
            .expect("handlers lock poisoned")
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }

    pub fn registered_channels(&self) -> Vec<String> {
        self.channels.names()
    }

    // ── Execution ───────────────────────────────────────────────────

    /// Run one invocation through its handler.
    ///
    /// # Errors
    ///
    /// Only when the invocation has an empty action type or rule_id. Handler
    /// failures are reported through `ActionResult::success`.
    pub async fn execute(&self, invocation: &ActionInvocation) -> Result<ActionResult, ActionExecutionError> {
        let action_type = invocation.action_type();
        if action_type.trim().is_empty() {
            return Err(ActionExecutionError::MissingActionType);
        }
        if invocation.rule_id.trim().is_empty() {
            return Err(ActionExecutionError::MissingRuleId {
                action_type: action_type.to_string(),
            });
        }

        let executed_at = Utc::now();
        let started = Instant::now();
        let handler = self
            .handlers
            .read()
            .expect("handlers lock poisoned")
            .get(action_type)
            .cloned();

        let result = match handler {
            None => ActionResult::failure(
                action_type,
                &invocation.rule_id,
                format!("no handler registered for action type '{action_type}'"),
                executed_at,
                0,
            ),
            Some(handler) => {
                let owned = invocation.clone();
                let joined = tokio::spawn(async move { handler.handle(&owned).await }).await;
                let duration_ms = millis(started.elapsed());
                match joined {
                    Ok(Ok(outcome)) => {
                        ActionResult::from_outcome(action_type, &invocation.rule_id, outcome, executed_at, duration_ms)
                    }
                    Ok(Err(e)) => {
                        ActionResult::failure(action_type, &invocation.rule_id, e.to_string(), executed_at, duration_ms)
                    }
                    Err(join_error) => ActionResult::failure(
                        action_type,
                        &invocation.rule_id,
                        format!("handler panicked: {}", panic_message(join_error)),
                        executed_at,
                        duration_ms,
                    ),
                }
            }
        };

        if result.success {
            info!(
                rule_id = %result.rule_id,
                action_type = %result.action_type,
                duration_ms = result.duration_ms,
                "action executed"
            );
        } else {
            warn!(
                rule_id = %result.rule_id,
                action_type = %result.action_type,
                error = result.error.as_deref().unwrap_or(""),
                "action failed"
            );
        }

        self.record(result.clone());
        Ok(result)
    }

    /// Run invocations one after another, in order. Every invocation yields a
    /// result, including structurally invalid ones.
    pub async fn execute_batch(&self, invocations: &[ActionInvocation]) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            let result = match self.execute(invocation).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(rule_id = %invocation.rule_id, error = %e, "invalid action invocation");
                    let result = ActionResult::failure(
                        invocation.action_type(),
                        &invocation.rule_id,
                        e.to_string(),
                        Utc::now(),
                        0,
                    );
                    self.record(result.clone());
                    result
                }
            };
            results.push(result);
        }
        results
    }

    /// [`execute_batch`](Self::execute_batch), then one audit entry per
    /// triggered rule carrying the combined result of its actions.
    pub async fn execute_audited(&self, invocations: &[ActionInvocation], audit: &AuditLogger) -> Vec<ActionResult> {
        let results = self.execute_batch(invocations).await;

        let mut audited: Vec<&str> = Vec::new();
        for invocation in invocations {
            let rule_id = invocation.rule_id.as_str();
            if audited.contains(&rule_id) {
                continue;
            }
            audited.push(rule_id);
            let own: Vec<&ActionResult> = invocations
                .iter()
                .zip(&results)
                .filter(|(i, _)| i.rule_id == rule_id)
                .map(|(_, r)| r)
                .collect();
            audit.log_invocation(invocation, trigger_outcome(&own)).await;
        }
        results
    }

    // ── History ─────────────────────────────────────────────────────

    fn record(&self, result: ActionResult) {
        let mut history = self.history.lock().expect("history lock poisoned");
        history.push_back(result);
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    /// Up to `limit` most recent results, newest first.
    pub fn history(&self, limit: usize) -> Vec<ActionResult> {
        let history = self.history.lock().expect("history lock poisoned");
        history.iter().rev().take(limit).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().expect("history lock poisoned").len()
    }

    pub fn clear_history(&self) {
        self.history.lock().expect("history lock poisoned").clear();
    }
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
