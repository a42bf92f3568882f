use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use verdict_actions::executor::ExecutorSettings;
use verdict_actions::ActionExecutor;
use verdict_core::config::Config;
use verdict_core::PredictionRecord;
use verdict_rules::store::{load_file, FileRuleStore};
use verdict_rules::{
    ActionInvocation, AuditFilter, AuditLogger, RuleParser, RuleRuntime, RuleWatcher,
};

use crate::cli::{EvaluateArgs, ValidateArgs};

/// Check every definition in a rule file. Fails when any is invalid.
pub fn validate(config: &Config, args: ValidateArgs) -> Result<()> {
    let parser = RuleParser::new().with_max_depth(args.max_depth.unwrap_or(config.rules.max_condition_depth));
    let definitions =
        load_file(&args.file).with_context(|| format!("failed to read rule file {}", args.file.display()))?;

    if definitions.is_empty() {
        println!("{}: no rule definitions", args.file.display());
        return Ok(());
    }

    let mut invalid = 0usize;
    for (index, definition) in definitions.iter().enumerate() {
        let label = definition
            .get("rule_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{index}"));
        let result = parser.validate(definition);

        if result.valid {
            println!("ok      {label}");
        } else {
            invalid += 1;
            println!("invalid {label}");
            for error in &result.errors {
                println!("  error: {error}");
            }
        }
        for warning in &result.warnings {
            println!("  warning: {}: {}", warning.path, warning.message);
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} rule definitions are invalid", definitions.len());
    }
    Ok(())
}

/// Evaluate NDJSON predictions, execute the resulting actions and print one
/// JSON line of results per prediction.
pub async fn evaluate(mut config: Config, args: EvaluateArgs) -> Result<()> {
    if let Some(dir) = args.rules_dir {
        config.rules.rules_dir = dir;
    }
    if args.simulate_webhooks {
        config.actions.webhook_simulate = true;
    }
    config.log_summary();

    let audit = AuditLogger::with_limit(config.audit.buffer_limit);
    let parser = RuleParser::new().with_max_depth(config.rules.max_condition_depth);
    let runtime = Arc::new(RuleRuntime::with_parser(parser));
    let executor = ActionExecutor::with_settings(ExecutorSettings::from_config(&config.actions));

    let rules_dir = config.rules.rules_dir.clone();
    let loaded = runtime
        .load_from_store(&FileRuleStore::new(rules_dir.clone()))
        .with_context(|| format!("failed to load rules from {}", rules_dir.display()))?;
    let ok = loaded.iter().filter(|r| r.is_loaded()).count();
    info!(loaded = ok, rejected = loaded.len() - ok, dir = %rules_dir.display(), "rules loaded");

    let _watcher = if args.watch {
        Some(
            RuleWatcher::start(FileRuleStore::new(rules_dir.clone()), Arc::clone(&runtime))
                .context("failed to start rule watcher")?,
        )
    } else {
        None
    };

    let processed = match args.input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open input {}", path.display()))?;
            run(BufReader::new(file), &runtime, &executor, &audit).await?
        }
        None => run(BufReader::new(tokio::io::stdin()), &runtime, &executor, &audit).await?,
    };

    let stats = audit.get_statistics(&AuditFilter::default()).await;
    info!(
        predictions = processed,
        triggers = stats.total,
        succeeded = stats.success,
        partial = stats.partial,
        failed = stats.failed,
        "evaluation finished"
    );
    Ok(())
}

async fn run<R>(
    reader: R,
    runtime: &RuleRuntime,
    executor: &ActionExecutor,
    audit: &AuditLogger,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut processed = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let prediction: PredictionRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed prediction");
                println!("{}", json!({"line": line_no, "error": e.to_string()}));
                continue;
            }
        };

        let invocations = runtime.evaluate(&prediction);
        let results = executor.execute_audited(&invocations, audit).await;

        let rules: Vec<&str> = dedup_rule_ids(&invocations);
        println!(
            "{}",
            json!({"line": line_no, "triggered_rules": rules, "results": results})
        );
        processed += 1;
    }

    Ok(processed)
}

/// Rule ids in first-trigger order.
fn dedup_rule_ids(invocations: &[ActionInvocation]) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::new();
    for invocation in invocations {
        if !ids.contains(&invocation.rule_id.as_str()) {
            ids.push(&invocation.rule_id);
        }
    }
    ids
}
