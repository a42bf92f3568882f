//! Error types for rule parsing, evaluation and rule stores.

use verdict_core::StoreError;

/// A rule definition was rejected. Carries every validation error found, not
/// just the first.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid rule{}: {}", .rule_id.as_deref().map(|id| format!(" '{id}'")).unwrap_or_default(), .errors.join("; "))]
pub struct RuleParseError {
    /// `rule_id` of the rejected definition, when it had a usable one.
    pub rule_id: Option<String>,
    pub errors: Vec<String>,
}

impl RuleParseError {
    pub fn new(rule_id: Option<String>, errors: Vec<String>) -> Self {
        Self { rule_id, errors }
    }
}

/// Unexpected fault while processing one rule during evaluation.
///
/// The runtime logs these and moves on to the next rule; they never reach the
/// caller of `evaluate`.
#[derive(Debug, thiserror::Error)]
pub enum RuleEvaluationError {
    #[error("cooldown of {seconds}s for rule '{rule_id}' overflows the clock")]
    CooldownOverflow { rule_id: String, seconds: u64 },
}

/// Failure of a single leaf comparison. Treated as `false` by the runtime.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("operator '{operator}' needs a numeric {side}, got {value}")]
    NotNumeric {
        operator: &'static str,
        side: &'static str,
        value: String,
    },

    #[error("operator '{operator}' needs a list value, got {value}")]
    ExpectedList { operator: &'static str, value: String },

    #[error("operator 'between' needs exactly 2 bounds, got {count}")]
    BetweenBounds { count: usize },
}

/// Errors raised while reading or watching a rule store.
#[derive(Debug, thiserror::Error)]
pub enum RuleStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
