//! Page collection repository.
//!
//! # Responsibility
//! - Persist the ordered page collection as one JSON array under
//!   `<namespace>:pages`.
//! - Map storage failures and missing pages to semantic errors.
//!
//! # Invariants
//! - Inserted and replaced pages are validated before touching storage;
//!   content writes change only content and `updatedAt`.
//! - Collection order is insertion order; updates keep a page's slot.
//! - Reads are lenient: an unreadable collection lists as empty and
//!   unreadable entries are skipped. Both are logged, neither is an error.
//! - Writes are strict: an unreadable collection fails with `InvalidData`
//!   and is never overwritten; unreadable entries are written back as-is.

use crate::model::page::{Page, PageId, PageValidationError};
use crate::repo::kv_store::{KeyValueStore, StorageError, StorageKeys};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(PageValidationError),
    Storage(StorageError),
    NotFound(PageId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "page not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid page data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl RepoError {
    /// Whether repeating the same write can succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::InvalidData(_))
    }
}

impl From<PageValidationError> for RepoError {
    fn from(value: PageValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StorageError> for RepoError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Repository interface for page CRUD.
pub trait PageRepository {
    /// All pages in collection order.
    fn list_pages(&self) -> RepoResult<Vec<Page>>;
    fn get_page(&self, id: &PageId) -> RepoResult<Option<Page>>;
    /// Appends a new page.
    fn insert_page(&self, page: &Page) -> RepoResult<()>;
    /// Replaces an existing page in place.
    fn update_page(&self, page: &Page) -> RepoResult<()>;
    fn delete_page(&self, id: &PageId) -> RepoResult<()>;
}

/// One element of the stored collection array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Page(Page),
    /// Entry this version cannot read; kept verbatim.
    Unreadable(Value),
}

impl StoredEntry {
    fn page(&self) -> Option<&Page> {
        match self {
            Self::Page(page) => Some(page),
            Self::Unreadable(_) => None,
        }
    }

    fn page_mut(&mut self) -> Option<&mut Page> {
        match self {
            Self::Page(page) => Some(page),
            Self::Unreadable(_) => None,
        }
    }
}

/// Key-value backed page repository.
#[derive(Debug, Clone)]
pub struct KvPageRepository<S> {
    store: S,
    keys: StorageKeys,
}

impl<S: KeyValueStore> KvPageRepository<S> {
    pub fn new(store: S, keys: StorageKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Readable pages in order; degrades instead of failing on bad data.
    fn read_pages(&self) -> RepoResult<Vec<Page>> {
        let Some(raw) = self.store.get(&self.keys.pages())? else {
            return Ok(Vec::new());
        };
        let entries = match decode_entries(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "event=pages_load module=repo status=degraded error_code=collection_corrupt error={}",
                    err
                );
                return Ok(Vec::new());
            }
        };
        let total = entries.len();
        let pages: Vec<Page> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                StoredEntry::Page(page) => Some(page),
                StoredEntry::Unreadable(_) => None,
            })
            .collect();
        if pages.len() != total {
            warn!(
                "event=pages_load module=repo status=degraded error_code=entry_corrupt skipped={}",
                total - pages.len()
            );
        }
        Ok(pages)
    }

    /// Every stored entry, for a read-modify-write cycle.
    fn load_for_write(&self) -> RepoResult<Vec<StoredEntry>> {
        let Some(raw) = self.store.get(&self.keys.pages())? else {
            return Ok(Vec::new());
        };
        decode_entries(&raw).map_err(|err| {
            error!(
                "event=pages_write module=repo status=rejected error_code=collection_corrupt error={}",
                err
            );
            RepoError::InvalidData(format!("stored page collection is unreadable: {err}"))
        })
    }

    fn save_entries(&self, entries: &[StoredEntry]) -> RepoResult<()> {
        let encoded = serde_json::to_string(entries)
            .map_err(|err| RepoError::InvalidData(err.to_string()))?;
        self.store.set(&self.keys.pages(), &encoded)?;
        Ok(())
    }

    /// Loads, applies `update` to the page with `id` and saves.
    ///
    /// `update` is responsible for validating what it changes.
    pub(crate) fn modify_page(
        &self,
        id: &PageId,
        update: impl FnOnce(&mut Page) -> Result<(), PageValidationError>,
    ) -> RepoResult<Page> {
        let mut entries = self.load_for_write()?;
        let page = entries
            .iter_mut()
            .filter_map(StoredEntry::page_mut)
            .find(|page| page.id == *id)
            .ok_or_else(|| RepoError::NotFound(id.clone()))?;
        update(page)?;
        let updated = page.clone();
        self.save_entries(&entries)?;
        Ok(updated)
    }
}

impl<S: KeyValueStore> PageRepository for KvPageRepository<S> {
    fn list_pages(&self) -> RepoResult<Vec<Page>> {
        self.read_pages()
    }

    fn get_page(&self, id: &PageId) -> RepoResult<Option<Page>> {
        Ok(self.read_pages()?.into_iter().find(|page| page.id == *id))
    }

    fn insert_page(&self, page: &Page) -> RepoResult<()> {
        page.validate()?;
        let mut entries = self.load_for_write()?;
        if entries
            .iter()
            .filter_map(StoredEntry::page)
            .any(|existing| existing.id == page.id)
        {
            return Err(RepoError::InvalidData(format!(
                "page id `{}` already exists",
                page.id
            )));
        }
        entries.push(StoredEntry::Page(page.clone()));
        self.save_entries(&entries)
    }

    fn update_page(&self, page: &Page) -> RepoResult<()> {
        page.validate()?;
        self.modify_page(&page.id, |stored| {
            *stored = page.clone();
            Ok(())
        })
        .map(|_| ())
    }

    fn delete_page(&self, id: &PageId) -> RepoResult<()> {
        let mut entries = self.load_for_write()?;
        let before = entries.len();
        entries.retain(|entry| entry.page().map_or(true, |page| page.id != *id));
        if entries.len() == before {
            return Err(RepoError::NotFound(id.clone()));
        }
        self.save_entries(&entries)
    }
}

fn decode_entries(raw: &str) -> Result<Vec<StoredEntry>, serde_json::Error> {
    serde_json::from_str(raw)
}
