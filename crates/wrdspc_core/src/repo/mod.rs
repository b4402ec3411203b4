//! Repository layer abstractions and storage implementations.
//!
//! # Responsibility
//! - Define the flat key-value contract and its backends.
//! - Map pages, per-page content and preferences onto storage keys.
//!
//! # Invariants
//! - Repository writes enforce `Page::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   storage transport errors.
//! - Unreadable persisted data degrades to "missing", never to a panic.

pub mod content_store;
pub mod kv_store;
pub mod page_repo;
pub mod preference_repo;

pub use content_store::{ContentStore, KeyedContentStore};
pub use kv_store::{
    KeyValueStore, MemoryStore, SqliteKvStore, StorageError, StorageKeys, StorageResult,
    DEFAULT_NAMESPACE,
};
pub use page_repo::{KvPageRepository, PageRepository, RepoError, RepoResult};
pub use preference_repo::PreferenceRepository;
