//! Audit trail of rule triggers.
//!
//! [`AuditLogger`] keeps a capped FIFO ring buffer of recent entries and
//! forwards each entry to an optional [`AuditStore`]. Store failures are
//! logged and swallowed: recording a trigger never fails the caller.
//!
//! Entries are written after a trigger's actions have run, so they carry the
//! real per-rule result. The buffer sits behind a `std::sync::RwLock` that is
//! never held across an `.await`.

mod entry;
mod store;


use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;
use verdict_core::{fields, stringify, PredictionRecord, StoreError};

use crate::model::Rule;
use crate::runtime::ActionInvocation;

pub use entry::{AuditEntry, AuditFilter, AuditStatistics, Pagination, TriggerResult};
pub use store::{AuditStore, InMemoryAuditStore};

/// Default ring buffer capacity.
pub const DEFAULT_BUFFER_LIMIT: usize = 1000;

/// Details of one trigger beyond the rule and prediction themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOutcome {
    pub actions_executed: Vec<String>,
    pub result: TriggerResult,
    pub error_message: Option<String>,
    pub duration_ms: Option<u64>,
}

impl TriggerOutcome {
    pub fn success(actions_executed: Vec<String>) -> Self {
        Self {
            actions_executed,
            result: TriggerResult::Success,
            error_message: None,
            duration_ms: None,
        }
    }

    pub fn with_error(mut self, result: TriggerResult, message: impl Into<String>) -> Self {
        self.result = result;
        self.error_message = Some(message.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

pub struct AuditLogger {
    buffer: RwLock<VecDeque<AuditEntry>>,
    limit: usize,
    store: Option<Arc<dyn AuditStore>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_BUFFER_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: RwLock::new(VecDeque::new()),
            limit: limit.max(1),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record one trigger. Always lands in the ring buffer; the store write is
    /// best-effort.
    pub async fn log_trigger(
        &self,
        rule: &Rule,
        prediction: &PredictionRecord,
        triggered_at: DateTime<Utc>,
        outcome: TriggerOutcome,
    ) -> AuditEntry {
        self.record(&rule.rule_id, &rule.name, prediction, triggered_at, outcome)
            .await
    }

    /// Record the trigger that produced `invocation`. Needs no registry
    /// lookup, so it still works after the rule was removed or replaced.
    pub async fn log_invocation(&self, invocation: &ActionInvocation, outcome: TriggerOutcome) -> AuditEntry {
        self.record(
            &invocation.rule_id,
            &invocation.rule_name,
            &invocation.prediction,
            invocation.triggered_at,
            outcome,
        )
        .await
    }

    async fn record(
        &self,
        rule_id: &str,
        rule_name: &str,
        prediction: &PredictionRecord,
        triggered_at: DateTime<Utc>,
        outcome: TriggerOutcome,
    ) -> AuditEntry {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            triggered_at,
            prediction: prediction.clone(),
            actions_executed: outcome.actions_executed,
            result: outcome.result,
            error_message: outcome.error_message,
            duration_ms: outcome.duration_ms,
            asset_id: prediction.get(fields::ASSET_ID).map(stringify),
            prediction_id: prediction.get(fields::PREDICTION_ID).map(stringify),
        };

        {
            let mut buffer = self.buffer.write().expect("audit buffer lock poisoned");
            buffer.push_back(entry.clone());
            while buffer.len() > self.limit {
                buffer.pop_front();
            }
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.record(&entry).await {
                warn!(rule_id = %entry.rule_id, entry_id = %entry.id, error = %e, "audit store write failed");
            }
        }

        debug!(rule_id = %entry.rule_id, result = ?entry.result, "trigger audited");
        entry
    }

    /// Matching entries, newest first. Answers from the store when one is
    /// attached (empty on store failure), otherwise from the ring buffer.
    pub async fn query_logs(&self, filter: &AuditFilter, page: Pagination) -> Vec<AuditEntry> {
        match &self.store {
            Some(store) => store.query(filter, page).await.unwrap_or_else(|e| {
                warn!(error = %e, "audit query failed");
                Vec::new()
            }),
            None => {
                let buffer = self.buffer.read().expect("audit buffer lock poisoned");
                store::select(buffer.iter(), filter, page)
            }
        }
    }

    /// Counts by result for entries matching `filter`; zeroed on store failure.
    pub async fn get_statistics(&self, filter: &AuditFilter) -> AuditStatistics {
        self.tally(filter).await.unwrap_or_else(|e| {
            warn!(error = %e, "audit statistics failed");
            AuditStatistics::default()
        })
    }

    async fn tally(&self, filter: &AuditFilter) -> Result<AuditStatistics, StoreError> {
        let mut counts = [0u64; 3];
        let results = [TriggerResult::Success, TriggerResult::Partial, TriggerResult::Failed];
        for (count, result) in counts.iter_mut().zip(results) {
            if !filter.result.is_some_and(|r| r != result) {
                *count = self.count(&filter.clone().with_result(result)).await?;
            }
        }
        let [success, partial, failed] = counts;
        Ok(AuditStatistics::from_counts(success, partial, failed))
    }

    async fn count(&self, filter: &AuditFilter) -> Result<u64, StoreError> {
        match &self.store {
            Some(store) => store.count(filter).await,
            None => {
                let buffer = self.buffer.read().expect("audit buffer lock poisoned");
                Ok(buffer.iter().filter(|e| filter.matches(e)).count() as u64)
            }
        }
    }

    /// Up to `limit` buffered entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let buffer = self.buffer.read().expect("audit buffer lock poisoned");
        buffer.iter().rev().take(limit).cloned().collect()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.read().expect("audit buffer lock poisoned").len()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
