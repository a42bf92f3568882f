//! Action execution for triggered rules.
//!
//! This crate provides:
//! - `ActionExecutor`: routes invocations to handlers by action type, isolates
//!   handler failures and keeps a capped execution history
//! - built-in `alert`, `notification`, `webhook` and `workorder` handlers
//! - `Notifier` channels behind a shared `ChannelRegistry`
//! - alarm store and ticketing collaborator traits with in-memory versions
//! - `{field}` placeholders and minijinja templates for messages and bodies

pub mod channels;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod memory;
pub mod result;
pub mod templating;
pub mod traits;

pub use channels::{ChannelRegistry, ChannelResult, LogChannel};
pub use error::{ActionError, ActionExecutionError};
pub use executor::{ActionExecutor, ExecutorSettings};
pub use result::{trigger_outcome, ActionOutcome, ActionResult};
pub use traits::{ActionHandler, AlarmStore, Notification, Notifier, TicketingClient};
