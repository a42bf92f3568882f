//! `notification`: fan a message out to named channels.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use verdict_core::{fields, stringify};
use verdict_rules::ActionInvocation;

use crate::channels::ChannelRegistry;
use crate::error::ActionError;
use crate::result::ActionOutcome;
use crate::templating::{fill_placeholders, invocation_lookup};
use crate::traits::{ActionHandler, Notification};

const DEFAULT_SUBJECT: &str = "Rule '{rule_name}' triggered";

/// Delivers to every channel in the action's `channels` list.
///
/// Succeeds when at least one channel delivered; `details.channels` holds the
/// per-channel breakdown, including unregistered channels as failures.
pub struct NotificationHandler {
    channels: Arc<ChannelRegistry>,
}

impl NotificationHandler {
    pub fn new(channels: Arc<ChannelRegistry>) -> Self {
        Self { channels }
    }
}

#[async_trait::async_trait]
impl ActionHandler for NotificationHandler {
    async fn handle(&self, invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError> {
        let action = &invocation.action;
        let channels = action.config_str_list("channels").unwrap_or_default();
        if channels.is_empty() {
            return Err(ActionError::Config(
                "notification action requires at least one channel".to_string(),
            ));
        }

        let lookup = invocation_lookup(invocation);
        let subject = fill_placeholders(action.config_str("subject").unwrap_or(DEFAULT_SUBJECT), &lookup);
        let body = match action.config_str("message") {
            Some(template) => fill_placeholders(template, &lookup),
            None => format!(
                "Rule '{}' matched a prediction at {}",
                invocation.rule_name,
                invocation.triggered_at.to_rfc3339()
            ),
        };

        let mut metadata = HashMap::from([
            ("rule_id".to_string(), invocation.rule_id.clone()),
            ("rule_name".to_string(), invocation.rule_name.clone()),
        ]);
        if let Some(severity) = action.config_str("severity") {
            metadata.insert("severity".to_string(), severity.to_string());
        }
        if let Some(asset_id) = invocation.prediction.get(fields::ASSET_ID) {
            metadata.insert("asset_id".to_string(), stringify(asset_id));
        }

        let notification = Notification {
            subject,
            body,
            recipients: action.config_str_list("recipients").unwrap_or_default(),
            metadata,
        };

        let results = self.channels.dispatch(&channels, &notification).await;
        let delivered = results.iter().filter(|r| r.success).count();
        let failed = results.len() - delivered;
        let breakdown: Vec<Value> = results
            .iter()
            .map(|r| {
                json!({
                    "channel": r.channel,
                    "success": r.success,
                    "error": r.error,
                    "duration_ms": r.duration_ms,
                })
            })
            .collect();

        let summary = format!("notification delivered to {delivered} of {} channels", results.len());
        let outcome = if delivered > 0 {
            ActionOutcome::succeeded(summary)
        } else {
            ActionOutcome::failed(summary, "all notification channels failed")
        };
        Ok(outcome
            .with_detail("channels", breakdown)
            .with_detail("delivered", delivered)
            .with_detail("failed", failed))
    }
}
