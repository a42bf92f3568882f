//! Handler, channel and collaborator traits plus the records they exchange.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use verdict_core::{PredictionRecord, StoreError};
use verdict_rules::ActionInvocation;

use crate::error::ActionError;
use crate::result::ActionOutcome;

/// Executes one action type.
///
/// Returning `Err` (or panicking) yields a failed result for that invocation
/// only; the executor keeps going.
#[async_trait::async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError>;
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
    /// Additional metadata (e.g., severity, rule_id).
    pub metadata: HashMap<String, String>,
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), ActionError>;

    /// Human-readable name for this channel (e.g., "email", "sms").
    fn channel_name(&self) -> &str;
}

/// Alarm raised by an `alert` action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alarm {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: String,
    pub message: String,
    pub asset_id: Option<String>,
    pub prediction_id: Option<String>,
    pub prediction: PredictionRecord,
    pub raised_at: DateTime<Utc>,
}

/// Persists alarms. Returns the stored alarm's id.
#[async_trait::async_trait]
pub trait AlarmStore: Send + Sync {
    async fn create_alarm(&self, alarm: &Alarm) -> Result<String, StoreError>;
}

/// Work order synthesized by a `workorder` action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkOrder {
    pub ticket_id: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub assignee: Option<String>,
    pub rule_id: String,
    pub asset_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// External ticketing system. Returns the system's own reference.
#[async_trait::async_trait]
pub trait TicketingClient: Send + Sync {
    async fn create_ticket(&self, order: &WorkOrder) -> Result<String, StoreError>;
}
