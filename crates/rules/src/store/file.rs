//! Directory-backed [`RuleStore`]: one rule or a list of rules per file.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{is_enabled, RuleStore};
use crate::error::RuleStoreError;

/// Outcome of reading one file during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLoadResult {
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Number of definitions the file contributed (enabled or not).
    Loaded { definitions: usize },
    Skipped { reason: String },
    Failed { error: String },
}

/// Scans a directory (recursively) for `*.json`, `*.yaml` and `*.yml` rule
/// files. Dotfiles and other extensions are skipped; a file that fails to
/// parse is reported and the scan carries on.
#[derive(Debug, Clone)]
pub struct FileRuleStore {
    rules_dir: PathBuf,
}

impl FileRuleStore {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Read every rule file. Returns all definitions found plus a per-file
    /// report.
    ///
    /// # Errors
    ///
    /// Fails only when the root directory itself cannot be read.
    pub fn scan(&self) -> Result<(Vec<Value>, Vec<FileLoadResult>), RuleStoreError> {
        let mut definitions = Vec::new();
        let mut report = Vec::new();
        let entries = sorted_entries(&self.rules_dir)?;
        self.scan_entries(entries, &mut definitions, &mut report);
        info!(
            path = %self.rules_dir.display(),
            files = report.len(),
            definitions = definitions.len(),
            "scanned rules directory"
        );
        Ok((definitions, report))
    }

    fn scan_dir(&self, dir: &Path, definitions: &mut Vec<Value>, report: &mut Vec<FileLoadResult>) {
        match sorted_entries(dir) {
            Ok(entries) => self.scan_entries(entries, definitions, report),
            Err(e) => warn!(path = %dir.display(), error = %e, "failed to read directory"),
        }
    }

    fn scan_entries(
        &self,
        entries: Vec<PathBuf>,
        definitions: &mut Vec<Value>,
        report: &mut Vec<FileLoadResult>,
    ) {
        for path in entries {
            if is_dotfile(&path) {
                if path.is_file() {
                    report.push(FileLoadResult {
                        path,
                        status: FileStatus::Skipped {
                            reason: "dotfile".to_string(),
                        },
                    });
                }
                continue;
            }

            if path.is_dir() {
                self.scan_dir(&path, definitions, report);
                continue;
            }

            if !is_rule_file(&path) {
                report.push(FileLoadResult {
                    path,
                    status: FileStatus::Skipped {
                        reason: "not a rule file".to_string(),
                    },
                });
                continue;
            }

            match load_file(&path) {
                Ok(found) => {
                    debug!(path = %path.display(), definitions = found.len(), "read rule file");
                    report.push(FileLoadResult {
                        path,
                        status: FileStatus::Loaded {
                            definitions: found.len(),
                        },
                    });
                    definitions.extend(found);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    report.push(FileLoadResult {
                        path,
                        status: FileStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }
    }
}

impl RuleStore for FileRuleStore {
    fn fetch_enabled_rules(&self) -> Result<Vec<Value>, RuleStoreError> {
        let (definitions, _) = self.scan()?;
        Ok(definitions.into_iter().filter(is_enabled).collect())
    }
}

/// Parse one file into its rule definitions.
///
/// A top-level list yields each element; anything else is one definition.
pub fn load_file(path: &Path) -> Result<Vec<Value>, RuleStoreError> {
    let contents = fs::read_to_string(path)?;
    let value: Value = match extension(path) {
        Some("json") => serde_json::from_str(&contents)?,
        _ => serde_yaml::from_str(&contents)?,
    };
    Ok(match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, RuleStoreError> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

pub(super) fn is_rule_file(path: &Path) -> bool {
    matches!(extension(path), Some("json" | "yaml" | "yml"))
}

pub(super) fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
