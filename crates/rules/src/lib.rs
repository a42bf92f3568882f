//! Declarative decision rules for model predictions.
//!
//! This crate provides:
//! - the rule DSL model ([`Rule`], condition trees, open action configs)
//! - a validating parser with aggregated, path-located errors
//! - [`RuleRuntime`]: priority-ordered evaluation with per-rule cooldowns
//! - [`AuditLogger`]: capped in-memory trail of triggers with a pluggable store
//! - rule stores, including a filesystem store with hot reload via `notify`

pub mod audit;
pub mod error;
pub mod model;
pub mod parser;
pub mod runtime;
pub mod store;

pub use audit::{AuditEntry, AuditFilter, AuditLogger, AuditStatistics, AuditStore, Pagination, TriggerOutcome, TriggerResult};
pub use error::{ConditionError, RuleEvaluationError, RuleParseError, RuleStoreError};
pub use model::{MAX_COOLDOWN_SECONDS, Action, Condition, ConditionGroup, ConditionNode, ConditionOperator, LogicalOperator, Rule};
pub use parser::{serialize, RuleParser, ValidationResult};
pub use runtime::{ActionInvocation, LoadResult, LoadStatus, RuleRuntime, RuleSource, TriggerObserver};
pub use store::{FileRuleStore, RuleStore, RuleWatcher, StaticRuleStore};
