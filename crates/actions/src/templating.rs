//! Message templating.
//!
//! Two flavours:
//! - [`fill_placeholders`]: `{field}` substitution used by alert and
//!   notification messages;
//! - [`TemplateRenderer`]: minijinja rendering for webhook `body_template`s,
//!   with access to the rule, the prediction and the action config.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use serde::Serialize;
use serde_json::{Map, Value};
use verdict_core::{stringify, PredictionRecord};
use verdict_rules::ActionInvocation;

use crate::error::ActionError;

/// Replace `{name}` placeholders with `lookup(name)`.
///
/// A placeholder may carry a numeric format after a colon: `{value:.2f}` (or
/// `{value:.2}`) for fixed decimals, `{value:f}` for six decimals and
/// `{value:d}` for the rounded integer. Other specs, and specs on
/// non-numeric values, insert the value unformatted.
///
/// Unknown placeholders are kept verbatim. `{{` and `}}` produce literal
/// braces.
pub fn fill_placeholders(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let name = &tail[1..end];
        let (field, spec) = match name.split_once(':') {
            Some((field, spec)) => (field, Some(spec.trim())),
            None => (name, None),
        };
        match lookup(field.trim()) {
            Some(value) if !name.contains('{') => out.push_str(&format_value(value, spec)),
            _ => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    out
}

fn format_value(value: String, spec: Option<&str>) -> String {
    let Some(spec) = spec.filter(|s| !s.is_empty()) else {
        return value;
    };
    let number = match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => number,
        _ => return value,
    };
    let digits = match spec {
        "d" => return format!("{}", number.round() as i64),
        "f" => Some(6),
        _ => spec
            .strip_prefix('.')
            .map(|p| p.strip_suffix('f').unwrap_or(p))
            .and_then(|p| p.parse::<usize>().ok()),
    };
    match digits {
        Some(digits) => format!("{number:.digits$}"),
        None => value,
    }
}

/// Placeholder lookup over a prediction, falling back to rule identity.
pub fn invocation_lookup(invocation: &ActionInvocation) -> impl Fn(&str) -> Option<String> + '_ {
    move |name: &str| {
        if let Some(value) = invocation.prediction.get(name) {
            return Some(stringify(value));
        }
        match name {
            "rule_id" => Some(invocation.rule_id.clone()),
            "rule_name" => Some(invocation.rule_name.clone()),
            "triggered_at" => Some(invocation.triggered_at.to_rfc3339()),
            _ => None,
        }
    }
}

/// Context data available to body templates.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub rule: RuleContext,
    pub prediction: PredictionRecord,
    /// The action's config map.
    pub action: Map<String, Value>,
    pub triggered_at: String,
    /// Current timestamp in ISO 8601 format.
    pub now: String,
}

/// Rule identity exposed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct RuleContext {
    pub id: String,
    pub name: String,
    pub priority: i64,
}

impl TemplateContext {
    pub fn from_invocation(invocation: &ActionInvocation) -> Self {
        Self {
            rule: RuleContext {
                id: invocation.rule_id.clone(),
                name: invocation.rule_name.clone(),
                priority: invocation.priority,
            },
            prediction: invocation.prediction.clone(),
            action: invocation.action.config.clone(),
            triggered_at: invocation.triggered_at.to_rfc3339(),
            now: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Renders templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters and globals.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_filter("tojson", tojson_filter);
        env.add_function("env", env_function);
        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &TemplateContext) -> Result<String, ActionError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| ActionError::Template(e.to_string()))
    }

    /// Check that a template string parses, without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), ActionError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| ActionError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Custom filter: serialize any value as compact JSON.
fn tojson_filter(value: minijinja::Value) -> Result<String, minijinja::Error> {
    serde_json::to_string(&value).map_err(|e| {
        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string())
    })
}

/// Global function: read an environment variable by name.
///
/// Returns an empty string (with a warning) if the variable is not set.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use verdict_rules::Action;

    fn sample_invocation() -> ActionInvocation {
        ActionInvocation {
            rule_id: "rule-001".to_string(),
            rule_name: "High Temperature".to_string(),
            priority: 2,
            action_index: 0,
            action: Action::new("webhook").with("team", json!("Ops")),
            prediction: json!({"asset_id": "pump-7", "predicted_value": 87.456, "zone": "A"})
                .as_object()
                .cloned()
                .unwrap(),
            triggered_at: chrono::Utc.with_ymd_and_hms(2026, 2, 16, 12, 0, 0).unwrap(),
        }
    }

    fn fill(template: &str) -> String {
        let invocation = sample_invocation();
        fill_placeholders(template, invocation_lookup(&invocation))
    }

    #[test]
    fn placeholders_use_prediction_fields() {
        assert_eq!(
            fill("Asset {asset_id} at {predicted_value}"),
            "Asset pump-7 at 87.456"
        );
    }

    #[test]
    fn placeholders_fall_back_to_rule_identity() {
        assert_eq!(fill("[{rule_id}] {rule_name}"), "[rule-001] High Temperature");
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        assert_eq!(fill("value {missing} in {zone}"), "value {missing} in A");
    }

    #[test]
    fn numeric_format_specs_are_applied() {
        assert_eq!(fill("{predicted_value:.1f}"), "87.5");
        assert_eq!(fill("{predicted_value:.4}"), "87.4560");
        assert_eq!(fill("{predicted_value:d}"), "87");
        assert_eq!(fill("{predicted_value:f}"), "87.456000");
        assert_eq!(fill("{ predicted_value : .0f }"), "87");
    }

    #[test]
    fn format_spec_falls_back_to_raw_value() {
        assert_eq!(fill("{zone:.2f}"), "A");
        assert_eq!(fill("{predicted_value:>8}"), "87.456");
        assert_eq!(fill("{predicted_value:}"), "87.456");
        assert_eq!(fill("{missing:.2f}"), "{missing:.2f}");
    }

    #[test]
    fn escaped_and_unbalanced_braces() {
        assert_eq!(fill("{{literal}} {zone}"), "{literal} A");
        assert_eq!(fill("open {zone"), "open {zone");
        assert_eq!(fill("close } here"), "close } here");
    }

    #[test]
    fn render_basic_template() {
        let renderer = TemplateRenderer::new();
        let ctx = TemplateContext::from_invocation(&sample_invocation());

        let template = "{{ rule.name }} fired for {{ prediction.asset_id }} ({{ action.team | lower }})";
        let result = renderer.render(template, &ctx).unwrap();
        assert_eq!(result, "High Temperature fired for pump-7 (ops)");
    }

    #[test]
    fn render_round_filter() {
        let renderer = TemplateRenderer::new();
        let ctx = TemplateContext::from_invocation(&sample_invocation());
        let result = renderer
            .render("{{ prediction.predicted_value | round(1) }}", &ctx)
            .unwrap();
        assert_eq!(result, "87.5");
    }

    #[test]
    fn render_tojson_filter() {
        let renderer = TemplateRenderer::new();
        let ctx = TemplateContext::from_invocation(&sample_invocation());
        let result = renderer
            .render(r#"{"zone": {{ prediction.zone | tojson }}}"#, &ctx)
            .unwrap();
        assert_eq!(result, r#"{"zone": "A"}"#);
    }

    #[test]
    fn render_env_function() {
        std::env::set_var("VERDICT_TEMPLATE_TEST_VAR", "hello");
        let renderer = TemplateRenderer::new();
        let ctx = TemplateContext::from_invocation(&sample_invocation());
        let result = renderer
            .render("Env: {{ env('VERDICT_TEMPLATE_TEST_VAR') }}", &ctx)
            .unwrap();
        assert_eq!(result, "Env: hello");
        std::env::remove_var("VERDICT_TEMPLATE_TEST_VAR");
    }

    #[test]
    fn invalid_template_produces_error() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("{{ unclosed").is_err());
        assert!(renderer.validate("Hello {{ rule.name }}").is_ok());

        let ctx = TemplateContext::from_invocation(&sample_invocation());
        match renderer.render("{{ unclosed", &ctx).unwrap_err() {
            ActionError::Template(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Template error, got: {:?}", other),
        }
    }
}
