//! Persistence seam for audit entries.

use std::sync::RwLock;

use verdict_core::StoreError;

use super::entry::{AuditEntry, AuditFilter, Pagination};

/// Durable home for audit entries (a database table in production).
///
/// Every call is best-effort from the logger's point of view: errors are
/// logged and never reach the triggering flow.
#[async_trait::async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Matching entries, newest first, windowed by `page`.
    async fn query(&self, filter: &AuditFilter, page: Pagination) -> Result<Vec<AuditEntry>, StoreError>;

    async fn count(&self, filter: &AuditFilter) -> Result<u64, StoreError>;
}

/// Unbounded in-process [`AuditStore`], mostly for tests and single-node runs.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("audit store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn record(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .expect("audit store lock poisoned")
            .push(entry.clone());
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter, page: Pagination) -> Result<Vec<AuditEntry>, StoreError> {
        let guard = self.entries.read().expect("audit store lock poisoned");
        Ok(select(guard.iter(), filter, page))
    }

    async fn count(&self, filter: &AuditFilter) -> Result<u64, StoreError> {
        let guard = self.entries.read().expect("audit store lock poisoned");
        Ok(guard.iter().filter(|e| filter.matches(e)).count() as u64)
    }
}

/// Newest-first filtered window over entries stored oldest-first.
pub(crate) fn select<'a>(
    entries: impl DoubleEndedIterator<Item = &'a AuditEntry>,
    filter: &AuditFilter,
    page: Pagination,
) -> Vec<AuditEntry> {
    entries
        .rev()
        .filter(|e| filter.matches(e))
        .skip(page.offset)
        .take(page.limit)
        .cloned()
        .collect()
}
