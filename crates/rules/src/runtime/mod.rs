//! Stateful rule runtime: the live rule registry plus cooldown state.
//!
//! [`RuleRuntime::evaluate`] turns one prediction record into an ordered list
//! of [`ActionInvocation`]s:
//!
//! 1. enabled rules, sorted by `priority` ascending, ties by `rule_id`;
//! 2. skip rules in cooldown (stale cooldowns are dropped on the way);
//! 3. skip rules whose `model_id` / `category_id` scope does not match;
//! 4. evaluate the condition tree (failing leaves count as `false`);
//! 5. on a match emit one invocation per action, start the cooldown and
//!    notify the [`TriggerObserver`].
//!
//! Registry and cooldowns share one mutex, so the cooldown check-then-set for
//! a rule can never interleave between two concurrent evaluations.

mod conditions;
mod cooldown;
mod invocation;


use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use verdict_core::{fields, scope_id, PredictionRecord};

use crate::error::{RuleEvaluationError, RuleParseError, RuleStoreError};
use crate::model::Rule;
use crate::parser::RuleParser;
use crate::store::RuleStore;

use cooldown::CooldownTracker;

pub use invocation::ActionInvocation;

/// Synchronous hook called on every rule trigger, before any action runs.
/// Must not block; outcome auditing happens after execution instead.
pub trait TriggerObserver: Send + Sync {
    fn on_trigger(&self, rule: &Rule, prediction: &PredictionRecord, triggered_at: DateTime<Utc>);
}

/// An item accepted by [`RuleRuntime::load_rules`].
#[derive(Debug, Clone)]
pub enum RuleSource {
    Dsl(Value),
    Parsed(Rule),
}

impl From<Value> for RuleSource {
    fn from(value: Value) -> Self {
        RuleSource::Dsl(value)
    }
}

impl From<Rule> for RuleSource {
    fn from(rule: Rule) -> Self {
        RuleSource::Parsed(rule)
    }
}

/// Outcome of loading one item of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    /// Position of the item in the batch.
    pub index: usize,
    pub status: LoadStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loaded { rule_id: String },
    Failed { rule_id: Option<String>, error: String },
}

impl LoadResult {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, LoadStatus::Loaded { .. })
    }
}

struct RuntimeState {
    rules: HashMap<String, Rule>,
    cooldowns: CooldownTracker,
}

/// Owns the rule registry and cooldown map.
///
/// Construct one at the composition root and share it by `Arc`.
pub struct RuleRuntime {
    state: Mutex<RuntimeState>,
    parser: RuleParser,
    observer: Option<Arc<dyn TriggerObserver>>,
}

impl RuleRuntime {
    pub fn new() -> Self {
        Self::with_parser(RuleParser::new())
    }

    /// Runtime whose DSL intake uses `parser` (e.g. with custom action types).
    pub fn with_parser(parser: RuleParser) -> Self {
        Self {
            state: Mutex::new(RuntimeState {
                rules: HashMap::new(),
                cooldowns: CooldownTracker::new(),
            }),
            parser,
            observer: None,
        }
    }

    /// Attach the collaborator notified on every trigger.
    pub fn with_observer(mut self, observer: Arc<dyn TriggerObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn parser(&self) -> &RuleParser {
        &self.parser
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().expect("runtime state lock poisoned")
    }

    // ── Registry ────────────────────────────────────────────────────

    /// Add or replace a rule after validating it.
    pub fn add_rule(&self, rule: Rule) -> Result<(), RuleParseError> {
        self.check(&rule)?;
        let rule_id = rule.rule_id.clone();
        let replaced = self.lock().rules.insert(rule_id.clone(), rule).is_some();
        info!(rule_id = %rule_id, replaced, "rule added");
        Ok(())
    }

    /// Parse a DSL map and add the resulting rule. Returns its `rule_id`.
    pub fn add_rule_dsl(&self, dsl: &Value) -> Result<String, RuleParseError> {
        let rule = self.parser.parse(dsl)?;
        let rule_id = rule.rule_id.clone();
        self.add_rule(rule)?;
        Ok(rule_id)
    }

    /// Remove a rule and any cooldown it was in.
    pub fn remove_rule(&self, rule_id: &str) -> Option<Rule> {
        let mut state = self.lock();
        state.cooldowns.clear(rule_id);
        let removed = state.rules.remove(rule_id);
        if removed.is_some() {
            info!(rule_id, "rule removed");
        }
        removed
    }

    pub fn enable_rule(&self, rule_id: &str) -> bool {
        self.set_enabled(rule_id, true)
    }

    pub fn disable_rule(&self, rule_id: &str) -> bool {
        self.set_enabled(rule_id, false)
    }

    fn set_enabled(&self, rule_id: &str, enabled: bool) -> bool {
        match self.lock().rules.get_mut(rule_id) {
            Some(rule) => {
                rule.enabled = enabled;
                info!(rule_id, enabled, "rule toggled");
                true
            }
            None => false,
        }
    }

    /// Apply a direct field update to a rule.
    ///
    /// The updated rule is validated before it replaces the old one; an
    /// invalid update (or one that changes `rule_id`) leaves the registry
    /// untouched. Returns `Ok(false)` when the rule does not exist.
    pub fn update_rule(
        &self,
        rule_id: &str,
        update: impl FnOnce(&mut Rule),
    ) -> Result<bool, RuleParseError> {
        let mut state = self.lock();
        let Some(current) = state.rules.get(rule_id) else {
            return Ok(false);
        };

        let mut updated = current.clone();
        update(&mut updated);
        if updated.rule_id != rule_id {
            return Err(RuleParseError::new(
                Some(rule_id.to_string()),
                vec!["rule_id: cannot be changed by an update".to_string()],
            ));
        }
        self.check(&updated)?;

        state.rules.insert(rule_id.to_string(), updated);
        info!(rule_id, "rule updated");
        Ok(true)
    }

    pub fn get_rule(&self, rule_id: &str) -> Option<Rule> {
        self.lock().rules.get(rule_id).cloned()
    }

    /// All rules (enabled or not) in evaluation order.
    pub fn rules(&self) -> Vec<Rule> {
        let state = self.lock();
        let mut rules: Vec<Rule> = state.rules.values().cloned().collect();
        rules.sort_by(|a, b| evaluation_order(a, b));
        rules
    }

    pub fn len(&self) -> usize {
        self.lock().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().rules.is_empty()
    }

    // ── Bulk loading ────────────────────────────────────────────────

    /// Add a batch of rules. Items that fail to parse or validate are logged
    /// and skipped; the rest of the batch still loads.
    pub fn load_rules<I, S>(&self, items: I) -> Vec<LoadResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<RuleSource>,
    {
        let (parsed, results) = self.prepare(items);
        let mut state = self.lock();
        for rule in parsed {
            state.rules.insert(rule.rule_id.clone(), rule);
        }
        drop(state);
        log_summary("rules loaded", &results);
        results
    }

    /// Replace the whole registry with a batch.
    ///
    /// Rules missing from the batch are removed. A rule whose new definition
    /// fails to parse keeps its previous version. Cooldowns survive for rules
    /// that are still present.
    pub fn replace_rules<I, S>(&self, items: I) -> Vec<LoadResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<RuleSource>,
    {
        let (parsed, results) = self.prepare(items);
        let mut next: HashMap<String, Rule> = parsed
            .into_iter()
            .map(|rule| (rule.rule_id.clone(), rule))
            .collect();

        let mut state = self.lock();
        for result in &results {
            if let LoadStatus::Failed { rule_id: Some(id), .. } = &result.status {
                if next.contains_key(id) {
                    continue;
                }
                if let Some(previous) = state.rules.get(id) {
                    warn!(rule_id = %id, "new definition rejected, keeping previous version");
                    next.insert(id.clone(), previous.clone());
                }
            }
        }

        state.cooldowns.retain(|id| next.contains_key(id));
        state.rules = next;
        drop(state);
        log_summary("rules replaced", &results);
        results
    }

    /// Load every enabled rule the store returns.
    pub fn load_from_store(&self, store: &dyn RuleStore) -> Result<Vec<LoadResult>, RuleStoreError> {
        let items = store.fetch_enabled_rules()?;
        Ok(self.load_rules(items))
    }

    /// Make the registry mirror the store's current enabled rules.
    pub fn sync_with_store(&self, store: &dyn RuleStore) -> Result<Vec<LoadResult>, RuleStoreError> {
        let items = store.fetch_enabled_rules()?;
        Ok(self.replace_rules(items))
    }

    fn prepare<I, S>(&self, items: I) -> (Vec<Rule>, Vec<LoadResult>)
    where
        I: IntoIterator<Item = S>,
        S: Into<RuleSource>,
    {
        let mut parsed = Vec::new();
        let mut results = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let outcome = match item.into() {
                RuleSource::Dsl(dsl) => self.parser.parse(&dsl),
                RuleSource::Parsed(rule) => self.check(&rule).map(|()| rule),
            };
            let status = match outcome {
                Ok(rule) => {
                    let rule_id = rule.rule_id.clone();
                    parsed.push(rule);
                    LoadStatus::Loaded { rule_id }
                }
                Err(e) => {
                    warn!(index, error = %e, "skipping invalid rule");
                    LoadStatus::Failed {
                        rule_id: e.rule_id.clone(),
                        error: e.to_string(),
                    }
                }
            };
            results.push(LoadResult { index, status });
        }

        (parsed, results)
    }

    fn check(&self, rule: &Rule) -> Result<(), RuleParseError> {
        let result = self.parser.validate_rule(rule);
        if result.valid {
            Ok(())
        } else {
            let rule_id = Some(rule.rule_id.clone()).filter(|id| !id.is_empty());
            Err(RuleParseError::new(rule_id, result.messages()))
        }
    }

    // ── Evaluation ──────────────────────────────────────────────────

    /// Evaluate a prediction record at the current time.
    pub fn evaluate(&self, prediction: &PredictionRecord) -> Vec<ActionInvocation> {
        self.evaluate_at(prediction, Utc::now())
    }

    /// Evaluate a prediction record as of `now`.
    pub fn evaluate_at(
        &self,
        prediction: &PredictionRecord,
        now: DateTime<Utc>,
    ) -> Vec<ActionInvocation> {
        let mut invocations = Vec::new();
        let mut triggered = Vec::new();

        {
            let mut state = self.lock();
            let RuntimeState { rules, cooldowns } = &mut *state;

            let mut ordered: Vec<&Rule> = rules.values().filter(|r| r.enabled).collect();
            ordered.sort_by(|a, b| evaluation_order(a, b));

            for rule in ordered {
                match process_rule(rule, prediction, now, cooldowns) {
                    Ok(Some(batch)) => {
                        info!(
                            rule_id = %rule.rule_id,
                            actions = batch.len(),
                            cooldown_seconds = rule.cooldown_seconds,
                            "rule triggered"
                        );
                        invocations.extend(batch);
                        if self.observer.is_some() {
                            triggered.push(rule.clone());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(rule_id = %rule.rule_id, error = %e, "rule evaluation failed, skipping");
                    }
                }
            }
        }

        if let Some(observer) = &self.observer {
            for rule in &triggered {
                observer.on_trigger(rule, prediction, now);
            }
        }

        invocations
    }

    // ── Cooldowns ───────────────────────────────────────────────────

    /// Time until `rule_id` may trigger again; `None` when not in cooldown.
    pub fn cooldown_remaining(&self, rule_id: &str) -> Option<Duration> {
        self.cooldown_remaining_at(rule_id, Utc::now())
    }

    pub fn cooldown_remaining_at(&self, rule_id: &str, now: DateTime<Utc>) -> Option<Duration> {
        self.lock().cooldowns.remaining(rule_id, now)
    }

    /// End a cooldown early. Returns whether one was active.
    pub fn clear_cooldown(&self, rule_id: &str) -> bool {
        self.lock().cooldowns.clear(rule_id)
    }
}

impl Default for RuleRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// `priority` ascending, then `rule_id` lexically.
fn evaluation_order(a: &Rule, b: &Rule) -> std::cmp::Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.rule_id.cmp(&b.rule_id))
}

fn scope_matches(rule: &Rule, prediction: &PredictionRecord) -> bool {
    let model_ok = rule
        .model_id
        .map_or(true, |id| scope_id(prediction, fields::MODEL_ID) == Some(id));
    let category_ok = rule
        .category_id
        .map_or(true, |id| scope_id(prediction, fields::CATEGORY_ID) == Some(id));
    model_ok && category_ok
}

fn process_rule(
    rule: &Rule,
    prediction: &PredictionRecord,
    now: DateTime<Utc>,
    cooldowns: &mut CooldownTracker,
) -> Result<Option<Vec<ActionInvocation>>, RuleEvaluationError> {
    if cooldowns.is_active(&rule.rule_id, now) {
        debug!(rule_id = %rule.rule_id, "rule in cooldown, skipping");
        return Ok(None);
    }

    if !scope_matches(rule, prediction) {
        debug!(rule_id = %rule.rule_id, "prediction outside rule scope, skipping");
        return Ok(None);
    }

    if !conditions::evaluate_group(&rule.conditions, prediction, &rule.rule_id) {
        return Ok(None);
    }

    cooldowns.start(&rule.rule_id, now, rule.cooldown_seconds)?;
    Ok(Some(ActionInvocation::for_rule(rule, prediction, now)))
}

fn log_summary(message: &str, results: &[LoadResult]) {
    let loaded = results.iter().filter(|r| r.is_loaded()).count();
    info!(loaded, failed = results.len() - loaded, "{message}");
}
