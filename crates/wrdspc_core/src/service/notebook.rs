//! Notebook facade: pages, editor sessions, debounced saving and theme.
//!
//! # Responsibility
//! - Wire page CRUD, the formatting dispatcher and the persistence gateway
//!   into the use-cases a host calls.
//! - Keep the application context (theme, direction) in sync with stored
//!   preferences.
//!
//! # Invariants
//! - Every mutating command schedules a debounced save of the session's
//!   serialization; non-mutating outcomes schedule nothing.
//! - Closing a session flushes its pending write synchronously.
//! - Deleting a page drops its pending write first.
//! - Unreadable stored content opens as an empty document.

use crate::config::CoreConfig;
use crate::editor::command::FormatCommand;
use crate::editor::dispatcher::{dispatch, DispatchError, DispatchOutcome};
use crate::editor::resolver::ActiveFormats;
use crate::editor::tracker::{Rect, SelectionTracker, TrackedRange};
use crate::html::{parse_html, to_html, to_markdown, HtmlParseError};
use crate::model::document::{Block, Document, TextPath};
use crate::model::page::{Page, PageId, PageValidationError};
use crate::model::preferences::{TextDirection, Theme};
use crate::model::selection::{Position, Selection};
use crate::repo::kv_store::KeyValueStore;
use crate::repo::page_repo::{KvPageRepository, RepoError};
use crate::repo::preference_repo::PreferenceRepository;
use crate::service::app_context::AppContext;
use crate::service::clock::Clock;
use crate::service::page_service::PageService;
use crate::service::persistence::{CommitResult, PersistenceError, PersistenceGateway};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum NotebookError {
    Validation(PageValidationError),
    NotFound(PageId),
    /// Storage rejected a read or write; in-memory state is kept.
    StorageFailure(RepoError),
    Dispatch(DispatchError),
    Markup(HtmlParseError),
}

impl Display for NotebookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "page not found: {id}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
            Self::Dispatch(err) => write!(f, "{err}"),
            Self::Markup(err) => write!(f, "invalid page markup: {err}"),
        }
    }
}

impl Error for NotebookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::StorageFailure(err) => Some(err),
            Self::Dispatch(err) => Some(err),
            Self::Markup(err) => Some(err),
        }
    }
}

impl From<RepoError> for NotebookError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::StorageFailure(other),
        }
    }
}

impl From<PersistenceError> for NotebookError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::StorageFailure { source, .. }
            | PersistenceError::Rejected { source, .. } => Self::from(source),
            PersistenceError::PageMissing(id) => Self::NotFound(id),
        }
    }
}

impl From<DispatchError> for NotebookError {
    fn from(value: DispatchError) -> Self {
        Self::Dispatch(value)
    }
}

impl From<HtmlParseError> for NotebookError {
    fn from(value: HtmlParseError) -> Self {
        Self::Markup(value)
    }
}

pub type NotebookResult<T> = Result<T, NotebookError>;

/// One open page: owned document, live selection and its tracker.
#[derive(Debug)]
pub struct EditorSession {
    page_id: PageId,
    document: Document,
    selection: Selection,
    tracker: SelectionTracker,
}

impl EditorSession {
    fn new(page_id: PageId, mut document: Document) -> Self {
        if document.text_paths().is_empty() {
            document.blocks.insert(0, Block::Paragraph(Vec::new()));
        }
        let start = document
            .text_paths()
            .into_iter()
            .next()
            .unwrap_or_else(|| TextPath::top(0));
        Self {
            page_id,
            document,
            selection: Selection::collapsed(Position::new(start, 0)),
            tracker: SelectionTracker::new(),
        }
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selection-change notification from the host.
    ///
    /// An unresolvable selection is ignored and the previous one is kept.
    pub fn select(&mut self, selection: Selection, rect: Option<Rect>) -> Option<&TrackedRange> {
        if selection.is_valid_in(&self.document) {
            self.selection = selection.clone();
            self.tracker.update(&self.document, Some(selection), rect)
        } else {
            self.tracker.clear();
            None
        }
    }

    pub fn tracked(&self) -> Option<&TrackedRange> {
        self.tracker.current()
    }

    /// Formats active at the current selection; empty when none resolve.
    pub fn active_formats(&self) -> ActiveFormats {
        self.tracker
            .current()
            .map(|range| range.active)
            .unwrap_or_default()
    }

    pub fn html(&self) -> String {
        to_html(&self.document)
    }

    /// Markdown export of the open document.
    pub fn markdown(&self) -> String {
        to_markdown(&self.document)
    }
}

/// Host-facing facade over one key-value store.
pub struct Notebook<S: KeyValueStore + Clone, C: Clock + Clone> {
    pages: PageService<KvPageRepository<S>, C>,
    gateway: PersistenceGateway<KvPageRepository<S>, C>,
    preferences: PreferenceRepository<S>,
    context: AppContext,
    clock: C,
}

impl<S: KeyValueStore + Clone, C: Clock + Clone> Notebook<S, C> {
    /// Opens a notebook; the stored theme wins over the configured default.
    pub fn open(store: S, clock: C, config: &CoreConfig) -> NotebookResult<Self> {
        let keys = config.storage_keys();
        let preferences = PreferenceRepository::new(store.clone(), keys.clone());
        let theme = preferences.load_theme()?.unwrap_or(config.default_theme);
        let notebook = Self {
            pages: PageService::new(
                KvPageRepository::new(store.clone(), keys.clone()),
                clock.clone(),
            ),
            gateway: PersistenceGateway::new(
                KvPageRepository::new(store, keys.clone()),
                clock.clone(),
                config.save_quiet_period_ms,
            ),
            preferences,
            context: AppContext::new(theme, TextDirection::default()),
            clock,
        };
        info!(
            "event=notebook_open module=notebook status=ok namespace={} legacy_keys={} theme={}",
            keys.namespace(),
            keys.is_legacy(),
            theme
        );
        Ok(notebook)
    }

    pub fn create_page(&self, title: &str, emoji: Option<&str>) -> NotebookResult<Page> {
        Ok(self.pages.create_page(title, emoji)?)
    }

    pub fn list_pages(&self) -> NotebookResult<Vec<Page>> {
        Ok(self.pages.list_pages()?)
    }

    pub fn get_page(&self, id: &PageId) -> NotebookResult<Page> {
        Ok(self.pages.get_page(id)?)
    }

    pub fn rename_page(&self, id: &PageId, title: &str) -> NotebookResult<Page> {
        Ok(self.pages.rename_page(id, title)?)
    }

    pub fn set_emoji(&self, id: &PageId, emoji: &str) -> NotebookResult<Page> {
        Ok(self.pages.set_emoji(id, emoji)?)
    }

    pub fn add_tag(&self, id: &PageId, tag: &str) -> NotebookResult<Page> {
        Ok(self.pages.add_tag(id, tag)?)
    }

    pub fn remove_tag(&self, id: &PageId, tag: &str) -> NotebookResult<Page> {
        Ok(self.pages.remove_tag(id, tag)?)
    }

    pub fn replace_tags(&self, id: &PageId, tags: &[String]) -> NotebookResult<Page> {
        Ok(self.pages.replace_tags(id, tags)?)
    }

    pub fn delete_page(&mut self, id: &PageId) -> NotebookResult<()> {
        self.gateway.discard(id);
        Ok(self.pages.delete_page(id)?)
    }

    /// Opens an editor session on the newest content of `id` (pending or
    /// stored).
    pub fn open_page(&self, id: &PageId) -> NotebookResult<EditorSession> {
        self.pages.get_page(id)?;
        let content = self.gateway.load(id).unwrap_or_default();
        let document = match parse_html(&content) {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    "event=page_open module=notebook status=degraded page_id={} error_code=content_unreadable error={}",
                    id, err
                );
                Document::new()
            }
        };
        Ok(EditorSession::new(id.clone(), document))
    }

    /// Applies one formatting command and schedules a save when it mutated.
    pub fn apply(
        &mut self,
        session: &mut EditorSession,
        command: &FormatCommand,
    ) -> NotebookResult<DispatchOutcome> {
        let outcome = dispatch(
            &mut session.document,
            &session.selection,
            command,
            self.clock.local_now(),
        )?;
        if outcome.changed() {
            self.gateway.save(&session.page_id, outcome.html.clone());
        }
        session.select(outcome.selection.clone(), None);
        Ok(outcome)
    }

    /// Replaces the session document with markup reported by the host's
    /// editing surface (typing, paste) and schedules a save.
    pub fn replace_content(&mut self, session: &mut EditorSession, html: &str) -> NotebookResult<()> {
        let document = parse_html(html)?;
        let selection = session.selection.clone();
        *session = EditorSession::new(session.page_id.clone(), document);
        session.select(selection, None);
        self.gateway.save(&session.page_id, session.html());
        Ok(())
    }

    /// Commits writes whose quiet period has elapsed.
    pub fn tick(&mut self) -> Vec<CommitResult> {
        self.gateway.poll()
    }

    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.gateway.next_deadline_ms()
    }

    /// Ends a session, committing its pending write now.
    pub fn close_page(&mut self, session: EditorSession) -> NotebookResult<()> {
        match self.gateway.flush_page(&session.page_id) {
            Some(Err(err)) => Err(err.into()),
            Some(Ok(_)) | None => Ok(()),
        }
    }

    /// Commits every pending write.
    pub fn flush(&mut self) -> Vec<CommitResult> {
        self.gateway.flush()
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.context
    }

    pub fn theme(&self) -> Theme {
        self.context.theme()
    }

    /// Sets and persists the theme. The context changes even when the
    /// write fails.
    pub fn set_theme(&mut self, theme: Theme) -> NotebookResult<()> {
        self.context.set_theme(theme);
        self.preferences.save_theme(theme)?;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> NotebookResult<Theme> {
        let theme = self.context.theme().toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::kv_store::MemoryStore;
    use crate::service::clock::ManualClock;

    fn notebook(store: &MemoryStore, clock: &ManualClock) -> Notebook<MemoryStore, ManualClock> {
        Notebook::open(store.clone(), clock.clone(), &CoreConfig::default()).unwrap()
    }

    #[test]
    fn open_page_of_missing_id_is_not_found() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let notebook = notebook(&store, &clock);
        assert!(matches!(
            notebook.open_page(&PageId::from("missing")),
            Err(NotebookError::NotFound(_))
        ));
    }

    #[test]
    fn fresh_page_opens_with_one_empty_paragraph() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let notebook = notebook(&store, &clock);
        let page = notebook.create_page("Blank", None).unwrap();
        let session = notebook.open_page(&page.id).unwrap();
        assert_eq!(session.document().blocks, vec![Block::Paragraph(Vec::new())]);
        assert_eq!(session.html(), "<p></p>");
    }

    #[test]
    fn unreadable_content_opens_empty() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let notebook = notebook(&store, &clock);
        let page = notebook.create_page("Broken", None).unwrap();
        notebook
            .pages
            .update_content(&page.id, "<p>unterminated <b")
            .unwrap();
        let session = notebook.open_page(&page.id).unwrap();
        assert_eq!(session.html(), "<p></p>");
    }

    #[test]
    fn mutating_command_schedules_save_and_close_flushes() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut notebook = notebook(&store, &clock);
        let page = notebook.create_page("Doc", None).unwrap();
        let mut session = notebook.open_page(&page.id).unwrap();
        notebook.replace_content(&mut session, "<p>hello</p>").unwrap();

        session.select(Selection::within(TextPath::top(0), 0, 5), None);
        let outcome = notebook.apply(&mut session, &FormatCommand::Bold).unwrap();
        assert!(outcome.changed());
        assert!(session.active_formats().bold);
        assert_eq!(notebook.next_deadline_ms(), Some(1_000));

        notebook.close_page(session).unwrap();
        let stored = notebook.get_page(&page.id).unwrap();
        assert_eq!(stored.content, "<p><strong>hello</strong></p>");
    }

    #[test]
    fn theme_toggle_persists_and_reloads() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let mut notebook = notebook(&store, &clock);
        assert_eq!(notebook.theme(), Theme::Dark);
        assert_eq!(notebook.toggle_theme().unwrap(), Theme::Light);

        let reopened = Notebook::open(store.clone(), clock.clone(), &CoreConfig::default()).unwrap();
        assert_eq!(reopened.theme(), Theme::Light);
    }
}
