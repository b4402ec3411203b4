//! Per-page content sinks used by the persistence gateway.
//!
//! `KvPageRepository` is the authoritative sink: content lives in the page
//! record and every write bumps `updatedAt`. `KeyedContentStore` writes the
//! bare fragment under `<namespace>:page:<id>` for hosts that want one key
//! per page.

use crate::model::page::PageId;
use crate::repo::kv_store::{KeyValueStore, StorageKeys};
use crate::repo::page_repo::{KvPageRepository, PageRepository, RepoResult};

/// Destination of debounced content writes.
pub trait ContentStore {
    fn write_content(&self, page_id: &PageId, content: &str, now_ms: i64) -> RepoResult<()>;
    /// `None` when the page or its content is missing.
    fn read_content(&self, page_id: &PageId) -> RepoResult<Option<String>>;
}

impl<S: KeyValueStore> ContentStore for KvPageRepository<S> {
    fn write_content(&self, page_id: &PageId, content: &str, now_ms: i64) -> RepoResult<()> {
        self.modify_page(page_id, |page| {
            page.content = content.to_string();
            page.touch(now_ms);
            Ok(())
        })
        .map(|_| ())
    }

    fn read_content(&self, page_id: &PageId) -> RepoResult<Option<String>> {
        Ok(self.get_page(page_id)?.map(|page| page.content))
    }
}

/// One key per page, content only.
#[derive(Debug, Clone)]
pub struct KeyedContentStore<S> {
    store: S,
    keys: StorageKeys,
}

impl<S: KeyValueStore> KeyedContentStore<S> {
    pub fn new(store: S, keys: StorageKeys) -> Self {
        Self { store, keys }
    }

    pub fn remove_content(&self, page_id: &PageId) -> RepoResult<()> {
        self.store
            .remove(&self.keys.page_content(page_id.as_str()))?;
        Ok(())
    }
}

impl<S: KeyValueStore> ContentStore for KeyedContentStore<S> {
    fn write_content(&self, page_id: &PageId, content: &str, _now_ms: i64) -> RepoResult<()> {
        self.store
            .set(&self.keys.page_content(page_id.as_str()), content)?;
        Ok(())
    }

    fn read_content(&self, page_id: &PageId) -> RepoResult<Option<String>> {
        Ok(self.store.get(&self.keys.page_content(page_id.as_str()))?)
    }
}
