//! Audit records and the query types used to read them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use verdict_core::PredictionRecord;

/// Outcome recorded for one rule trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerResult {
    Success,
    Partial,
    Failed,
}

impl TriggerResult {
    /// Classify a trigger from its action outcomes.
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => TriggerResult::Success,
            (0, _) => TriggerResult::Failed,
            _ => TriggerResult::Partial,
        }
    }
}

/// One rule trigger as kept in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub rule_id: String,
    pub rule_name: String,
    pub triggered_at: DateTime<Utc>,
    pub prediction: PredictionRecord,
    /// Action types run for this trigger, in declaration order.
    pub actions_executed: Vec<String>,
    pub result: TriggerResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Copied from the prediction's `asset_id`, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<String>,
}

/// Criteria for selecting audit entries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub rule_id: Option<String>,
    pub result: Option<TriggerResult>,
    pub asset_id: Option<String>,
    /// Inclusive lower bound on `triggered_at`.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `triggered_at`.
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn for_rule(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: Some(rule_id.into()),
            ..Self::default()
        }
    }

    pub fn with_result(mut self, result: TriggerResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if self.rule_id.as_ref().is_some_and(|id| *id != entry.rule_id) {
            return false;
        }
        if self.result.is_some_and(|r| r != entry.result) {
            return false;
        }
        if self
            .asset_id
            .as_ref()
            .is_some_and(|a| entry.asset_id.as_ref() != Some(a))
        {
            return false;
        }
        if self.since.is_some_and(|since| entry.triggered_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| entry.triggered_at >= until) {
            return false;
        }
        true
    }
}

/// Offset/limit window over newest-first results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// Aggregate trigger counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStatistics {
    pub total: u64,
    pub success: u64,
    pub partial: u64,
    pub failed: u64,
    /// `success / total` as a percentage, 0 when there are no entries.
    pub success_rate: f64,
}

impl AuditStatistics {
    pub fn from_counts(success: u64, partial: u64, failed: u64) -> Self {
        let total = success + partial + failed;
        let success_rate = if total == 0 {
            0.0
        } else {
            success as f64 / total as f64 * 100.0
        };
        Self {
            total,
            success,
            partial,
            failed,
            success_rate,
        }
    }
}
