//! `workorder`: synthesize a maintenance ticket for the triggering asset.

use std::sync::Arc;

use tracing::{info, warn};
use verdict_core::{fields, stringify};
use verdict_rules::ActionInvocation;

use crate::error::ActionError;
use crate::result::ActionOutcome;
use crate::templating::{fill_placeholders, invocation_lookup};
use crate::traits::{ActionHandler, TicketingClient, WorkOrder};

const DEFAULT_PRIORITY: &str = "medium";
const DEFAULT_TITLE: &str = "Work order for rule '{rule_name}'";

/// Builds a [`WorkOrder`] whose id is derived from the trigger time
/// (`WO-YYYYMMDDHHMMSS`) and forwards it to a ticketing system when one is
/// attached. Ticketing failures are recorded under `ticketing_error` and do
/// not fail the action.
#[derive(Default)]
pub struct WorkOrderHandler {
    ticketing: Option<Arc<dyn TicketingClient>>,
}

impl WorkOrderHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticketing(mut self, client: Arc<dyn TicketingClient>) -> Self {
        self.ticketing = Some(client);
        self
    }
}

#[async_trait::async_trait]
impl ActionHandler for WorkOrderHandler {
    async fn handle(&self, invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError> {
        let action = &invocation.action;
        let lookup = invocation_lookup(invocation);
        let ticket_id = format!("WO-{}", invocation.triggered_at.format("%Y%m%d%H%M%S"));

        let order = WorkOrder {
            ticket_id: ticket_id.clone(),
            title: fill_placeholders(action.config_str("title").unwrap_or(DEFAULT_TITLE), &lookup),
            description: match action.config_str("description") {
                Some(template) => fill_placeholders(template, &lookup),
                None => format!("Raised by rule '{}' ({})", invocation.rule_name, invocation.rule_id),
            },
            priority: action.config_str("priority").unwrap_or(DEFAULT_PRIORITY).to_string(),
            assignee: action.config_str("assignee").map(str::to_string),
            rule_id: invocation.rule_id.clone(),
            asset_id: invocation.prediction.get(fields::ASSET_ID).map(stringify),
            created_at: invocation.triggered_at,
        };

        let mut outcome = ActionOutcome::succeeded(format!("work order {ticket_id} created"))
            .with_detail("ticket_id", ticket_id.as_str())
            .with_detail("title", order.title.as_str())
            .with_detail("priority", order.priority.as_str())
            .with_detail("created_at", order.created_at.to_rfc3339());
        if let Some(assignee) = &order.assignee {
            outcome = outcome.with_detail("assignee", assignee.as_str());
        }
        if let Some(asset_id) = &order.asset_id {
            outcome = outcome.with_detail("asset_id", asset_id.as_str());
        }

        if let Some(client) = &self.ticketing {
            outcome = match client.create_ticket(&order).await {
                Ok(reference) => outcome.with_detail("external_ref", reference),
                Err(e) => {
                    warn!(rule_id = %invocation.rule_id, ticket_id = %ticket_id, error = %e, "ticket creation failed");
                    outcome.with_detail("ticketing_error", e.to_string())
                }
            };
        }

        info!(rule_id = %invocation.rule_id, ticket_id = %ticket_id, "work order created");
        Ok(outcome)
    }
}
