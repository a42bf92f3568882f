//! Per-rule cooldown state: `rule_id → absolute expiry`.
//!
//! A rule is either not in cooldown (no entry) or in cooldown (entry with an
//! expiry in the future). Entries whose expiry has passed are dropped lazily
//! the next time they are checked.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::RuleEvaluationError;

#[derive(Debug, Default)]
pub(crate) struct CooldownTracker {
    expiries: HashMap<String, DateTime<Utc>>,
}

impl CooldownTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether `rule_id` is suppressed at `now`. Drops a stale entry.
    pub(crate) fn is_active(&mut self, rule_id: &str, now: DateTime<Utc>) -> bool {
        self.remaining(rule_id, now).is_some()
    }

    /// Time left until `rule_id` may trigger again, or `None` when it is not
    /// in cooldown. Drops a stale entry.
    pub(crate) fn remaining(&mut self, rule_id: &str, now: DateTime<Utc>) -> Option<Duration> {
        let expiry = *self.expiries.get(rule_id)?;
        if now >= expiry {
            self.expiries.remove(rule_id);
            return None;
        }
        (expiry - now).to_std().ok()
    }

    /// Enter cooldown for `seconds` from `now`. Zero seconds is a no-op.
    pub(crate) fn start(
        &mut self,
        rule_id: &str,
        now: DateTime<Utc>,
        seconds: u64,
    ) -> Result<Option<DateTime<Utc>>, RuleEvaluationError> {
        if seconds == 0 {
            return Ok(None);
        }
        let overflow = || RuleEvaluationError::CooldownOverflow {
            rule_id: rule_id.to_string(),
            seconds,
        };
        let window = i64::try_from(seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(overflow)?;
        let expiry = now.checked_add_signed(window).ok_or_else(overflow)?;
        self.expiries.insert(rule_id.to_string(), expiry);
        Ok(Some(expiry))
    }

    pub(crate) fn clear(&mut self, rule_id: &str) -> bool {
        self.expiries.remove(rule_id).is_some()
    }

    /// Keep only entries whose rule still exists.
    pub(crate) fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.expiries.retain(|id, _| keep(id));
    }

    pub(crate) fn len(&self) -> usize {
        self.expiries.len()
    }
}
