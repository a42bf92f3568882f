//! Error types for action handlers and the executor.

/// Failure inside a single action handler.
///
/// The executor converts these into a failed `ActionResult`; they never
/// abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel delivery failed: {0}")]
    Channel(String),
}

/// Structurally invalid invocation handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionExecutionError {
    #[error("invocation has an empty action type")]
    MissingActionType,

    #[error("invocation of '{action_type}' has an empty rule_id")]
    MissingRuleId { action_type: String },
}
