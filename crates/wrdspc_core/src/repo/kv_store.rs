//! Flat key-value storage contract and its backends.
//!
//! # Responsibility
//! - Define the string-keyed store every repository writes through.
//! - Provide an in-memory backend (browser local-store analogue, with an
//!   optional byte quota) and a SQLite backend.
//!
//! # Invariants
//! - `set` overwrites; last writer wins.
//! - A rejected `set` leaves the previous value untouched.

use crate::db::{DbError, DbResult};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Namespace used when the configuration does not override it.
pub const DEFAULT_NAMESPACE: &str = "wrdspc";

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    /// Write would exceed the store's byte quota.
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
    Db(DbError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded {
                key,
                needed,
                available,
            } => write!(
                f,
                "storage quota exceeded writing `{key}`: needed {needed} bytes, {available} available"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::QuotaExceeded { .. } => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// String-keyed, string-valued store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Key layout under one namespace.
///
/// The legacy layout has no namespace and uses the bare `pages`, `theme`
/// and `page:<id>` keys written by the browser app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    pub fn new(namespace: &str) -> Self {
        let namespace = namespace.trim();
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        Self {
            namespace: namespace.to_string(),
        }
    }

    /// Un-namespaced keys shared with the browser app's local storage.
    pub fn legacy() -> Self {
        Self {
            namespace: String::new(),
        }
    }

    /// Empty for the legacy layout.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_legacy(&self) -> bool {
        self.namespace.is_empty()
    }

    /// JSON array of every page.
    pub fn pages(&self) -> String {
        self.key("pages")
    }

    pub fn theme(&self) -> String {
        self.key("theme")
    }

    pub fn page_content(&self, page_id: &str) -> String {
        self.key(&format!("page:{page_id}"))
    }

    fn key(&self, name: &str) -> String {
        if self.is_legacy() {
            name.to_string()
        } else {
            format!("{}:{name}", self.namespace)
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    writes: usize,
}

impl MemoryState {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, value)| existing.len() + value.len())
            .sum()
    }
}

/// Shared in-memory store. Clones are handles to the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.set_quota(Some(bytes));
        store
    }

    pub fn set_quota(&self, bytes: Option<usize>) {
        self.state.borrow_mut().quota_bytes = bytes;
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.state.borrow().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(quota) = state.quota_bytes {
            let used = state.used_bytes_without(key);
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                warn!(
                    "event=kv_set module=repo status=error backend=memory error_code=quota_exceeded needed={} available={}",
                    needed, available
                );
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        state.entries.insert(key.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.state.borrow_mut().entries.remove(key);
        Ok(())
    }
}

/// SQLite-backed store over the `kv_entries` table.
#[derive(Debug, Clone, Copy)]
pub struct SqliteKvStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> DbResult<Self> {
        ensure_kv_table_ready(conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKvStore<'_> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

fn ensure_kv_table_ready(conn: &Connection) -> DbResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'kv_entries'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(DbError::SchemaNotReady("kv_entries"))
    }
}
