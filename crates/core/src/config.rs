use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub rules: RulesConfig,
    pub actions: ActionsConfig,
    pub audit: AuditConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VERDICT_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VERDICT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            rules: RulesConfig::from_env_profiled(p),
            actions: ActionsConfig::from_env_profiled(p),
            audit: AuditConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  rules:    dir={}, max_condition_depth={}",
            self.rules.rules_dir.display(),
            self.rules.max_condition_depth
        );
        tracing::info!(
            "  actions:  history_limit={}, webhook_timeout={}s, webhook_simulate={}",
            self.actions.history_limit,
            self.actions.webhook_timeout_secs,
            self.actions.webhook_simulate
        );
        tracing::info!("  audit:    buffer_limit={}", self.audit.buffer_limit);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            rules: RulesConfig::default(),
            actions: ActionsConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directory scanned by the file rule store.
    pub rules_dir: PathBuf,
    /// Deepest condition-group nesting accepted by the parser.
    pub max_condition_depth: usize,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "RULES_DIR", "data/rules")),
            max_condition_depth: profiled_env_usize(p, "MAX_CONDITION_DEPTH", 32),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("data/rules"),
            max_condition_depth: 32,
        }
    }
}

// ── Actions ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Number of action results kept in the executor history.
    pub history_limit: usize,
    /// Default webhook timeout when the action config does not set one.
    pub webhook_timeout_secs: u64,
    /// Skip real HTTP calls and report simulated webhook deliveries.
    pub webhook_simulate: bool,
}

impl ActionsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            history_limit: profiled_env_usize(p, "ACTION_HISTORY_LIMIT", 1000),
            webhook_timeout_secs: profiled_env_u64(p, "WEBHOOK_TIMEOUT_SECS", 30),
            webhook_simulate: profiled_env_bool(p, "WEBHOOK_SIMULATE", false),
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            webhook_timeout_secs: 30,
            webhook_simulate: false,
        }
    }
}

// ── Audit ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Number of audit entries kept in memory.
    pub buffer_limit: usize,
}

impl AuditConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            buffer_limit: profiled_env_usize(p, "AUDIT_BUFFER_LIMIT", 1000),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { buffer_limit: 1000 }
    }
}
