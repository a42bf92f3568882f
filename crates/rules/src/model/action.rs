//! Actions attached to a rule and the built-in action type names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Built-in action types understood by the parser without registration.
pub mod action_types {
    pub const ALERT: &str = "alert";
    pub const NOTIFICATION: &str = "notification";
    pub const WEBHOOK: &str = "webhook";
    pub const WORKORDER: &str = "workorder";

    pub const BUILTIN: [&str; 4] = [ALERT, NOTIFICATION, WEBHOOK, WORKORDER];
}

/// A typed directive executed when its rule triggers.
///
/// `config` is an open map; the DSL writes it flat next to `type`, e.g.
/// `{"type": "webhook", "url": "https://...", "method": "PUT"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

impl Action {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            config: Map::new(),
        }
    }

    /// Builder-style config setter.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// String config entry; empty strings count as absent.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f.ceil() as u64))
        })
    }

    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(Value::as_bool)
    }

    /// List-of-strings config entry; non-string items are skipped.
    pub fn config_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.config.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    /// String-to-string map config entry (e.g. HTTP headers).
    pub fn config_str_map(&self, key: &str) -> Option<Vec<(String, String)>> {
        self.config.get(key).and_then(Value::as_object).map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_is_flattened_next_to_type() {
        let action = Action::new(action_types::WEBHOOK)
            .with("url", json!("https://hooks.example.com/x"))
            .with("method", json!("PUT"));
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({"type": "webhook", "url": "https://hooks.example.com/x", "method": "PUT"})
        );

        let back: Action = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn typed_accessors() {
        let action = Action::new("notification")
            .with("channels", json!(["email", 3, "sms"]))
            .with("timeout_seconds", json!(2.5))
            .with("title", json!("   "))
            .with("headers", json!({"X-Key": "abc", "X-Num": 1}));

        assert_eq!(
            action.config_str_list("channels"),
            Some(vec!["email".to_string(), "sms".to_string()])
        );
        assert_eq!(action.config_u64("timeout_seconds"), Some(3));
        assert_eq!(action.config_str("title"), None);
        assert_eq!(
            action.config_str_map("headers"),
            Some(vec![("X-Key".to_string(), "abc".to_string())])
        );
        assert_eq!(action.config_bool("missing"), None);
    }
}
