//! Debounced persistence gateway.
//!
//! # Responsibility
//! - Coalesce rapid content saves per page into one write after a quiet
//!   period.
//! - Commit pending writes on demand (teardown) and serve synchronous loads.
//!
//! # Invariants
//! - At most one pending write per page; a newer save replaces the value
//!   and restarts the quiet period.
//! - A write that failed for a transient reason stays pending and is
//!   retried by the next `poll` or flush; the caller's in-memory document
//!   is never touched.
//! - A write for a page that no longer exists, or one the repository
//!   rejects as invalid, is dropped.
//!
//! # See also
//! - `service::notebook` for the session that drives `poll`.

use crate::model::page::PageId;
use crate::repo::content_store::ContentStore;
use crate::repo::page_repo::RepoError;
use crate::service::clock::Clock;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Quiet period used when the configuration does not override it.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 1_000;

#[derive(Debug)]
pub enum PersistenceError {
    /// The store rejected the write; the value is still pending.
    StorageFailure { page_id: PageId, source: RepoError },
    /// The page was deleted before its write landed; the value was dropped.
    PageMissing(PageId),
    /// The repository refused the value itself; retrying cannot help, so it
    /// was dropped.
    Rejected { page_id: PageId, source: RepoError },
}

impl PersistenceError {
    pub fn page_id(&self) -> &PageId {
        match self {
            Self::StorageFailure { page_id, .. }
            | Self::PageMissing(page_id)
            | Self::Rejected { page_id, .. } => page_id,
        }
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageFailure { page_id, source } => {
                write!(f, "failed to save page {page_id}: {source}")
            }
            Self::PageMissing(page_id) => write!(f, "page {page_id} no longer exists"),
            Self::Rejected { page_id, source } => {
                write!(f, "save for page {page_id} was rejected: {source}")
            }
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure { source, .. } | Self::Rejected { source, .. } => Some(source),
            Self::PageMissing(_) => None,
        }
    }
}

/// Acknowledgement for one committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveAck {
    pub page_id: PageId,
    pub committed_at_ms: i64,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    value: String,
    due_at_ms: i64,
}

pub type CommitResult = Result<SaveAck, PersistenceError>;

pub struct PersistenceGateway<T: ContentStore, C: Clock> {
    store: T,
    clock: C,
    quiet_period_ms: i64,
    pending: BTreeMap<PageId, PendingWrite>,
}

impl<T: ContentStore, C: Clock> PersistenceGateway<T, C> {
    pub fn new(store: T, clock: C, quiet_period_ms: u64) -> Self {
        Self {
            store,
            clock,
            quiet_period_ms: i64::try_from(quiet_period_ms).unwrap_or(i64::MAX),
            pending: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    /// Schedules `value` for `page_id`, replacing any pending value.
    pub fn save(&mut self, page_id: &PageId, value: impl Into<String>) {
        let due_at_ms = self.clock.now_ms().saturating_add(self.quiet_period_ms);
        let replaced = self
            .pending
            .insert(
                page_id.clone(),
                PendingWrite {
                    value: value.into(),
                    due_at_ms,
                },
            )
            .is_some();
        debug!(
            "event=save_schedule module=persistence status=ok page_id={} replaced={} due_at_ms={}",
            page_id, replaced, due_at_ms
        );
    }

    /// Commits every write whose quiet period has elapsed.
    pub fn poll(&mut self) -> Vec<CommitResult> {
        let now = self.clock.now_ms();
        let due: Vec<PageId> = self
            .pending
            .iter()
            .filter(|(_, write)| write.due_at_ms <= now)
            .map(|(page_id, _)| page_id.clone())
            .collect();
        due.iter().filter_map(|page_id| self.commit(page_id)).collect()
    }

    /// Commits every pending write immediately.
    pub fn flush(&mut self) -> Vec<CommitResult> {
        let all: Vec<PageId> = self.pending.keys().cloned().collect();
        all.iter().filter_map(|page_id| self.commit(page_id)).collect()
    }

    /// Commits the pending write for one page; `None` when nothing is pending.
    pub fn flush_page(&mut self, page_id: &PageId) -> Option<CommitResult> {
        self.commit(page_id)
    }

    /// Drops the pending write for `page_id` without committing it.
    pub fn discard(&mut self, page_id: &PageId) -> bool {
        self.pending.remove(page_id).is_some()
    }

    /// Pending value when one exists, otherwise the stored value.
    ///
    /// Missing or unreadable content yields `None`.
    pub fn load(&self, page_id: &PageId) -> Option<String> {
        if let Some(write) = self.pending.get(page_id) {
            return Some(write.value.clone());
        }
        match self.store.read_content(page_id) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=content_load module=persistence status=degraded page_id={} error={}",
                    page_id, err
                );
                None
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, page_id: &PageId) -> bool {
        self.pending.contains_key(page_id)
    }

    /// Earliest deadline among pending writes, for hosts that sleep until it.
    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.pending.values().map(|write| write.due_at_ms).min()
    }

    fn commit(&mut self, page_id: &PageId) -> Option<CommitResult> {
        let write = self.pending.remove(page_id)?;
        let now = self.clock.now_ms();
        match self.store.write_content(page_id, &write.value, now) {
            Ok(()) => {
                info!(
                    "event=save_commit module=persistence status=ok page_id={} bytes={}",
                    page_id,
                    write.value.len()
                );
                Some(Ok(SaveAck {
                    page_id: page_id.clone(),
                    committed_at_ms: now,
                    bytes: write.value.len(),
                }))
            }
            Err(RepoError::NotFound(_)) => {
                warn!(
                    "event=save_commit module=persistence status=dropped page_id={} error_code=page_missing",
                    page_id
                );
                Some(Err(PersistenceError::PageMissing(page_id.clone())))
            }
            Err(err) if !err.is_retryable() => {
                error!(
                    "event=save_commit module=persistence status=dropped page_id={} error_code=write_rejected error={}",
                    page_id, err
                );
                Some(Err(PersistenceError::Rejected {
                    page_id: page_id.clone(),
                    source: err,
                }))
            }
            Err(err) => {
                error!(
                    "event=save_commit module=persistence status=error page_id={} error_code=storage_failure error={}",
                    page_id, err
                );
                self.pending.insert(page_id.clone(), write);
                Some(Err(PersistenceError::StorageFailure {
                    page_id: page_id.clone(),
                    source: err,
                }))
            }
        }
    }
}

impl<T: ContentStore, C: Clock> Drop for PersistenceGateway<T, C> {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        for result in self.flush() {
            if let Err(err) = result {
                error!(
                    "event=save_flush_on_drop module=persistence status=error page_id={} error={}",
                    err.page_id(),
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::page::PageValidationError;
    use crate::repo::content_store::KeyedContentStore;
    use crate::repo::page_repo::RepoResult;
    use crate::repo::kv_store::{KeyValueStore, MemoryStore, StorageKeys};
    use crate::service::clock::ManualClock;

    fn gateway(
        memory: &MemoryStore,
        clock: &ManualClock,
    ) -> PersistenceGateway<KeyedContentStore<MemoryStore>, ManualClock> {
        PersistenceGateway::new(
            KeyedContentStore::new(memory.clone(), StorageKeys::default()),
            clock.clone(),
            DEFAULT_QUIET_PERIOD_MS,
        )
    }

    #[test]
    fn nothing_commits_before_quiet_period() {
        let memory = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut gateway = gateway(&memory, &clock);
        let id = PageId::from("p");

        gateway.save(&id, "A");
        clock.advance(999);
        assert!(gateway.poll().is_empty());
        clock.advance(1);
        assert_eq!(gateway.poll().len(), 1);
        assert_eq!(memory.get("wrdspc:page:p").unwrap().as_deref(), Some("A"));
    }

    #[test]
    fn resave_restarts_quiet_period() {
        let memory = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut gateway = gateway(&memory, &clock);
        let id = PageId::from("p");

        gateway.save(&id, "A");
        clock.advance(600);
        gateway.save(&id, "B");
        clock.advance(600);
        assert!(gateway.poll().is_empty());
        assert_eq!(gateway.next_deadline_ms(), Some(1_600));
        clock.advance(400);
        gateway.poll();
        assert_eq!(memory.write_count(), 1);
        assert_eq!(gateway.load(&id).as_deref(), Some("B"));
    }

    #[test]
    fn failed_write_stays_pending_until_retry_succeeds() {
        let memory = MemoryStore::with_quota(4);
        let clock = ManualClock::new(0);
        let mut gateway = gateway(&memory, &clock);
        let id = PageId::from("p");

        gateway.save(&id, "<p>too long</p>");
        clock.advance(1_000);
        let results = gateway.poll();
        assert!(matches!(
            results.as_slice(),
            [Err(PersistenceError::StorageFailure { .. })]
        ));
        assert!(gateway.is_pending(&id));

        memory.set_quota(None);
        let retried = gateway.flush_page(&id).expect("write was pending");
        assert!(retried.is_ok());
        assert_eq!(gateway.pending_count(), 0);
    }

    struct RejectingStore;

    impl ContentStore for RejectingStore {
        fn write_content(&self, _page_id: &PageId, _content: &str, _now_ms: i64) -> RepoResult<()> {
            Err(RepoError::Validation(PageValidationError::BlankTitle))
        }

        fn read_content(&self, _page_id: &PageId) -> RepoResult<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn rejected_write_is_dropped_not_retried() {
        let clock = ManualClock::new(0);
        let mut gateway = PersistenceGateway::new(RejectingStore, clock.clone(), 1_000);
        let id = PageId::from("p");

        gateway.save(&id, "<p>x</p>");
        clock.advance(1_000);
        assert!(matches!(
            gateway.poll().as_slice(),
            [Err(PersistenceError::Rejected {
                source: RepoError::Validation(_),
                ..
            })]
        ));
        assert!(!gateway.is_pending(&id));
        assert!(gateway.flush().is_empty());
    }

    #[test]
    fn discard_and_drop() {
        let memory = MemoryStore::new();
        let clock = ManualClock::new(0);
        {
            let mut gateway = gateway(&memory, &clock);
            gateway.save(&PageId::from("gone"), "x");
            assert!(gateway.discard(&PageId::from("gone")));
            gateway.save(&PageId::from("kept"), "y");
        }
        assert_eq!(memory.get("wrdspc:page:gone").unwrap(), None);
        assert_eq!(memory.get("wrdspc:page:kept").unwrap().as_deref(), Some("y"));
    }

    #[test]
    fn load_of_missing_page_is_none() {
        let memory = MemoryStore::new();
        let clock = ManualClock::new(0);
        let gateway = gateway(&memory, &clock);
        assert_eq!(gateway.load(&PageId::from("missing-id")), None);
    }
}
