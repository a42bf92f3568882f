//! Sources of rule definitions for [`RuleRuntime`](crate::runtime::RuleRuntime).
//!
//! A store hands back raw DSL maps; parsing and validation stay in the
//! runtime so every source goes through the same checks.

mod file;
mod watcher;

use serde_json::Value;

use crate::error::RuleStoreError;
use crate::model::Rule;
use crate::parser::serialize;

pub use file::{load_file, FileLoadResult, FileRuleStore, FileStatus};
pub use watcher::RuleWatcher;

/// Anything that can list the currently enabled rule definitions.
pub trait RuleStore: Send + Sync {
    /// DSL maps of every enabled rule. Disabled definitions are left out.
    fn fetch_enabled_rules(&self) -> Result<Vec<Value>, RuleStoreError>;
}

/// Whether a raw definition is enabled; a missing `enabled` key means yes.
pub(crate) fn is_enabled(dsl: &Value) -> bool {
    dsl.get("enabled").and_then(Value::as_bool).unwrap_or(true)
}

/// Fixed list of definitions, e.g. embedded in a binary or built in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleStore {
    definitions: Vec<Value>,
}

impl StaticRuleStore {
    pub fn new(definitions: Vec<Value>) -> Self {
        Self { definitions }
    }

    pub fn from_rules(rules: &[Rule]) -> Self {
        Self::new(rules.iter().map(serialize).collect())
    }
}

impl RuleStore for StaticRuleStore {
    fn fetch_enabled_rules(&self) -> Result<Vec<Value>, RuleStoreError> {
        Ok(self
            .definitions
            .iter()
            .filter(|dsl| is_enabled(dsl))
            .cloned()
            .collect())
    }
}
