//! `webhook`: deliver the trigger as an HTTP request.
//!
//! The request body is a JSON payload with the rule identity, trigger time,
//! prediction and action config, or the rendered `body_template` when one is
//! configured. Environment variable references (`${VAR_NAME}`) in the URL and
//! header values are resolved per call.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use verdict_core::config::ActionsConfig;
use verdict_rules::ActionInvocation;

use crate::error::ActionError;
use crate::result::ActionOutcome;
use crate::templating::{TemplateContext, TemplateRenderer};
use crate::traits::ActionHandler;

/// Executor-wide webhook defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    /// Used when the action has no `timeout_seconds`.
    pub default_timeout: Duration,
    /// Skip the network and report a simulated delivery.
    pub simulate: bool,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            simulate: false,
        }
    }
}

impl WebhookSettings {
    pub fn from_config(config: &ActionsConfig) -> Self {
        Self {
            default_timeout: Duration::from_secs(config.webhook_timeout_secs.max(1)),
            simulate: config.webhook_simulate,
        }
    }
}

/// Sends one HTTP request per invocation. Success means a 2xx response.
#[derive(Debug)]
pub struct WebhookHandler {
    settings: WebhookSettings,
    renderer: TemplateRenderer,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookHandler {
    pub fn new(settings: WebhookSettings) -> Self {
        Self {
            settings,
            renderer: TemplateRenderer::new(),
            client: reqwest::Client::new(),
        }
    }

    fn body(&self, invocation: &ActionInvocation) -> Result<String, ActionError> {
        if let Some(template) = invocation.action.config_str("body_template") {
            return self
                .renderer
                .render(template, &TemplateContext::from_invocation(invocation));
        }
        serde_json::to_string(&payload(invocation))
            .map_err(|e| ActionError::Config(format!("failed to serialize webhook payload: {e}")))
    }
}

impl Default for WebhookHandler {
    fn default() -> Self {
        Self::new(WebhookSettings::default())
    }
}

#[async_trait::async_trait]
impl ActionHandler for WebhookHandler {
    async fn handle(&self, invocation: &ActionInvocation) -> Result<ActionOutcome, ActionError> {
        let action = &invocation.action;
        let url = action
            .config_str("url")
            .ok_or_else(|| ActionError::Config("webhook action requires a 'url'".to_string()))?;
        let url = resolve_env_vars(url)?;
        let method = parse_method(action.config_str("method"))?;
        let timeout = action
            .config_u64("timeout_seconds")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.settings.default_timeout);

        let mut headers = Vec::new();
        for (key, value) in action.config_str_map("headers").unwrap_or_default() {
            headers.push((key, resolve_env_vars(&value)?));
        }
        let body = self.body(invocation)?;

        if self.settings.simulate {
            info!(rule_id = %invocation.rule_id, url = %url, method = %method, "webhook simulated");
            return Ok(ActionOutcome::succeeded(format!("webhook simulated: {method} {url}"))
                .with_detail("simulated", true)
                .with_detail("url", url)
                .with_detail("method", method.as_str()));
        }

        let mut request = self
            .client
            .request(method.clone(), &url)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        for (key, value) in &headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(ActionError::Timeout {
                    secs: timeout.as_secs(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(url = %url, %status, body = %body_text, "webhook returned non-2xx status");
            return Ok(ActionOutcome::failed(
                format!("webhook returned {status}"),
                format!("webhook returned {status}: {body_text}"),
            )
            .with_detail("status_code", status.as_u16())
            .with_detail("url", url));
        }

        debug!(url = %url, method = %method, status = %status, "webhook delivered");
        Ok(ActionOutcome::succeeded(format!("webhook delivered: {status}"))
            .with_detail("status_code", status.as_u16())
            .with_detail("url", url)
            .with_detail("method", method.as_str()))
    }
}

/// Default JSON body for a webhook call.
pub(crate) fn payload(invocation: &ActionInvocation) -> Value {
    json!({
        "rule_id": invocation.rule_id,
        "rule_name": invocation.rule_name,
        "triggered_at": invocation.triggered_at.to_rfc3339(),
        "prediction": invocation.prediction,
        "action_config": invocation.action.config,
    })
}

/// Parse an HTTP method name case-insensitively; `None` means POST.
fn parse_method(method: Option<&str>) -> Result<reqwest::Method, ActionError> {
    match method {
        None => Ok(reqwest::Method::POST),
        Some(m) => m
            .to_uppercase()
            .parse::<reqwest::Method>()
            .map_err(|_| ActionError::Config(format!("invalid HTTP method: {m}"))),
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, ActionError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(ActionError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| ActionError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
