//! Routes notifications to named channels.
//!
//! The registry maps channel names (`email`, `sms`, ...) to [`Notifier`]s.
//! Delivery goes to every requested channel in order; one channel failing or
//! being unregistered doesn't block the others.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ActionError;
use crate::traits::{Notification, Notifier};

/// Channels registered out of the box, each backed by a [`LogChannel`].
pub const DEFAULT_CHANNELS: [&str; 3] = ["email", "sms", "log"];

/// Result of delivering a notification to a single channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub channel: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Channel name → notifier. Shared between the executor and the notification
/// handler so channels registered later are picked up immediately.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, Arc<dyn Notifier>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a [`LogChannel`] for each of [`DEFAULT_CHANNELS`].
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for name in DEFAULT_CHANNELS {
            registry.register(name, Arc::new(LogChannel::new(name)));
        }
        registry
    }

    /// Add or replace the notifier behind `channel`.
    pub fn register(&self, channel: impl Into<String>, notifier: Arc<dyn Notifier>) {
        let channel = channel.into();
        info!(channel = %channel, notifier = notifier.channel_name(), "notification channel registered");
        self.channels
            .write()
            .expect("channel registry lock poisoned")
            .insert(channel, notifier);
    }

    pub fn get(&self, channel: &str) -> Option<Arc<dyn Notifier>> {
        self.channels
            .read()
            .expect("channel registry lock poisoned")
            .get(channel)
            .cloned()
    }

    /// Registered channel names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .channels
            .read()
            .expect("channel registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Deliver `notification` to each named channel in order.
    pub async fn dispatch(&self, channels: &[String], notification: &Notification) -> Vec<ChannelResult> {
        let mut results = Vec::with_capacity(channels.len());

        for channel in channels {
            let Some(notifier) = self.get(channel) else {
                warn!(channel = %channel, "no handler registered for notification channel");
                results.push(ChannelResult {
                    channel: channel.clone(),
                    success: false,
                    error: Some(format!("no handler registered for channel '{channel}'")),
                    duration_ms: 0,
                });
                continue;
            };

            let start = Instant::now();
            let result = notifier.send(notification).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let error = match result {
                Ok(()) => {
                    info!(channel = %channel, duration_ms, "Notification delivered");
                    None
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, duration_ms, "Notification delivery failed");
                    Some(e.to_string())
                }
            };

            results.push(ChannelResult {
                channel: channel.clone(),
                success: error.is_none(),
                error,
                duration_ms,
            });
        }

        results
    }
}

/// Channel that records deliveries in the log instead of contacting a
/// provider. Stands in for email/SMS until a real notifier is registered.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait::async_trait]
impl Notifier for LogChannel {
    async fn send(&self, notification: &Notification) -> Result<(), ActionError> {
        info!(
            channel = %self.name,
            subject = %notification.subject,
            recipients = ?notification.recipients,
            "notification logged"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _notification: &Notification) -> Result<(), ActionError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(ActionError::Channel("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            &self.name
        }
    }

    fn notification() -> Notification {
        Notification {
            subject: "test".to_string(),
            body: "test body".to_string(),
            recipients: vec![],
            metadata: HashMap::new(),
        }
    }

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn dispatch_to_all_channels() {
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        let registry = ChannelRegistry::new();
        registry.register(
            "a",
            Arc::new(MockNotifier { name: "a".into(), send_count: count_a.clone(), should_fail: false }),
        );
        registry.register(
            "b",
            Arc::new(MockNotifier { name: "b".into(), send_count: count_b.clone(), should_fail: false }),
        );

        let results = registry.dispatch(&channels(&["a", "b"]), &notification()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_failure_doesnt_block() {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = ChannelRegistry::new();
        registry.register(
            "fail",
            Arc::new(MockNotifier { name: "fail".into(), send_count: Arc::new(AtomicUsize::new(0)), should_fail: true }),
        );
        registry.register(
            "ok",
            Arc::new(MockNotifier { name: "ok".into(), send_count: count.clone(), should_fail: false }),
        );

        let results = registry.dispatch(&channels(&["fail", "missing", "ok"]), &notification()).await;
        assert_eq!(results.len(), 3);
        assert!(!results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.as_deref().unwrap().contains("missing"));
        assert!(results[2].success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn defaults_are_log_channels() {
        let registry = ChannelRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["email", "log", "sms"]);
        let results = registry.dispatch(&channels(&["sms"]), &notification()).await;
        assert!(results[0].success);
    }
}
