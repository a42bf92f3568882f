//! Hot reload: re-sync a runtime whenever its rules directory changes.

use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use super::file::{is_dotfile, is_rule_file, FileRuleStore};
use crate::error::RuleStoreError;
use crate::runtime::RuleRuntime;

/// Keeps a filesystem watcher alive. Dropping it stops hot reload.
pub struct RuleWatcher {
    _watcher: RecommendedWatcher,
}

impl RuleWatcher {
    /// Watch `store`'s directory and replace `runtime`'s rules with the
    /// store's contents after every relevant change.
    ///
    /// A definition that no longer parses keeps its previous version; a
    /// deleted file removes its rules.
    pub fn start(store: FileRuleStore, runtime: Arc<RuleRuntime>) -> Result<Self, RuleStoreError> {
        let rules_dir = store.rules_dir().to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) if is_relevant(&event) => match runtime.sync_with_store(&store) {
                Ok(results) => {
                    let loaded = results.iter().filter(|r| r.is_loaded()).count();
                    info!(loaded, total = results.len(), "hot-reloaded rules");
                }
                Err(e) => warn!(error = %e, "hot reload failed, keeping current rules"),
            },
            Ok(_) => {}
            Err(e) => warn!(error = %e, "filesystem watcher error"),
        })?;

        watcher.watch(&rules_dir, RecursiveMode::Recursive)?;
        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %rules_dir.display(), "watching rules directory for changes (recursive)");
        Ok(Self { _watcher: watcher })
    }
}

fn is_relevant(event: &Event) -> bool {
    let touches_rules = event
        .paths
        .iter()
        .any(|path| is_rule_file(path) && !is_dotfile(path));
    touches_rules
        && matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        )
}
