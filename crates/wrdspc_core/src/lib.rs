//! Core domain logic for the wrdspc notebook.
//! This crate is the single source of truth for page, formatting and
//! persistence invariants.

pub mod config;
pub mod db;
pub mod editor;
pub mod html;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use editor::{
    dispatch, resolve_active_formats, suggest, ActiveFormats, AncestorTag, DispatchError,
    DispatchOutcome, DispatchStatus, FormatCommand, FormatId, SelectionTracker, TagName, CATALOG,
};
pub use html::{parse_html, to_html, to_markdown, to_plain_text, HtmlParseError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::document::{Block, Document, HeadingLevel, List, ListItem, ListKind, TextPath};
pub use model::inline::{InlineStyle, TextRun};
pub use model::page::{Page, PageId, PageValidationError};
pub use model::preferences::{TextDirection, Theme};
pub use model::selection::{Position, Selection};
pub use repo::{
    ContentStore, KeyValueStore, KeyedContentStore, KvPageRepository, MemoryStore,
    PageRepository, RepoError, SqliteKvStore, StorageError, StorageKeys,
};
pub use service::{
    AppContext, Clock, EditorSession, ManualClock, Notebook, NotebookError, PersistenceGateway,
    SystemClock,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
