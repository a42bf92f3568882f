//! `alert`: format a message from the prediction and raise an alarm.

use std::sync::Arc;

use tracing::{info, warn};
use verdict_core::{fields, stringify};
use verdict_rules::ActionInvocation;

use crate::error::ActionError;
use crate::result::ActionOutcome;
use crate::templating::{fill_placeholders, invocation_lookup};
use crate::traits::{ActionHandler, Alarm, AlarmStore};

const DEFAULT_MESSAGE: &str = "Rule '{rule_name}' triggered";
const DEFAULT_SEVERITY: &str = "warning";

/// Formats `message` (`{field}` placeholders filled from the prediction) and
/// persists an [`Alarm`] when a store is attached.
///
/// Persistence is best-effort: a store failure is recorded under
/// `persistence_error` in the details and the alert still succeeds.
#[derive(Default)]
pub struct AlertHandler {
    alarm_store: Option<Arc<dyn AlarmStore>>,
}

impl AlertHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alarm_store(mut self, store: Arc<dyn AlarmStore>) -> Self {
        self.alarm_store = Some(store);
        self
    }
}

#[async_trait::async_trait]
impl ActionHandler for AlertHandler {
    async fn handle(&self, invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError> {
        let action = &invocation.action;
        let severity = action.config_str("severity").unwrap_or(DEFAULT_SEVERITY);
        let template = action.config_str("message").unwrap_or(DEFAULT_MESSAGE);
        let message = fill_placeholders(template, invocation_lookup(invocation));

        let alarm = Alarm {
            rule_id: invocation.rule_id.clone(),
            rule_name: invocation.rule_name.clone(),
            severity: severity.to_string(),
            message: message.clone(),
            asset_id: invocation.prediction.get(fields::ASSET_ID).map(stringify),
            prediction_id: invocation.prediction.get(fields::PREDICTION_ID).map(stringify),
            prediction: invocation.prediction.clone(),
            raised_at: invocation.triggered_at,
        };

        let mut outcome = ActionOutcome::succeeded(message.clone())
            .with_detail("severity", severity)
            .with_detail("alert_message", message);

        if let Some(store) = &self.alarm_store {
            outcome = match store.create_alarm(&alarm).await {
                Ok(alarm_id) => outcome.with_detail("alarm_id", alarm_id),
                Err(e) => {
                    warn!(rule_id = %invocation.rule_id, error = %e, "alarm persistence failed");
                    outcome.with_detail("persistence_error", e.to_string())
                }
            };
        }

        info!(rule_id = %invocation.rule_id, severity, "alert raised");
        Ok(outcome)
    }
}
