use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Decision engine worker for model predictions.
///
/// Loads declarative rules, evaluates predictions against them and executes
/// the actions of every rule that fires.
#[derive(Parser, Debug)]
#[command(name = "verdict", about = "Rule-driven decisions for model predictions")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a rule file (JSON or YAML, one rule or a list)
    Validate(ValidateArgs),
    /// Evaluate NDJSON predictions against a rules directory
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Rule file to check
    pub file: PathBuf,

    /// Deepest condition nesting accepted
    #[arg(long, env = "MAX_CONDITION_DEPTH")]
    pub max_depth: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory of rule files (default: RULES_DIR or data/rules)
    #[arg(long, env = "RULES_DIR")]
    pub rules_dir: Option<PathBuf>,

    /// NDJSON file of predictions; reads stdin when omitted
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Reload rules when files in the rules directory change
    #[arg(long)]
    pub watch: bool,

    /// Report webhook deliveries without sending requests
    #[arg(long)]
    pub simulate_webhooks: bool,
}
