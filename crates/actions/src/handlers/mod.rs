//! Built-in handlers for the `alert`, `notification`, `webhook` and
//! `workorder` action types.

mod alert;
mod notification;
mod webhook;
mod workorder;

pub use alert::AlertHandler;
pub use notification::NotificationHandler;
pub use webhook::{WebhookHandler, WebhookSettings};
pub use workorder::WorkOrderHandler;
