//! Page use-case service.
//!
//! # Responsibility
//! - Create, rename, re-emoji, tag, update and delete pages.
//! - Stamp `createdAt`/`updatedAt` from the injected clock.
//!
//! # Invariants
//! - Every successful mutation bumps `updatedAt`; it never moves backwards.
//! - Titles and tags are trimmed; blank values are rejected before storage.
//! - Logs carry ids and counts only, never titles or content.

use crate::model::page::{
    normalize_tag, normalize_tags, normalize_title, Page, PageId, DEFAULT_EMOJI,
};
use crate::repo::page_repo::{PageRepository, RepoError, RepoResult};
use crate::service::clock::Clock;
use log::info;

/// Page service facade over a repository implementation.
pub struct PageService<R: PageRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: PageRepository, C: Clock> PageService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Creates a page; `emoji` defaults to 📝 when absent or blank.
    pub fn create_page(&self, title: &str, emoji: Option<&str>) -> RepoResult<Page> {
        let page = Page::new(title, emoji, self.clock.now_ms())?;
        self.repo.insert_page(&page)?;
        info!(
            "event=page_create module=page status=ok page_id={}",
            page.id
        );
        Ok(page)
    }

    /// All pages in collection order.
    pub fn list_pages(&self) -> RepoResult<Vec<Page>> {
        self.repo.list_pages()
    }

    pub fn get_page(&self, id: &PageId) -> RepoResult<Page> {
        self.repo
            .get_page(id)?
            .ok_or_else(|| RepoError::NotFound(id.clone()))
    }

    pub fn rename_page(&self, id: &PageId, title: &str) -> RepoResult<Page> {
        let title = normalize_title(title)?;
        self.mutate(id, "page_rename", |page| page.title = title)
    }

    /// Sets the emoji; a blank value restores the default.
    pub fn set_emoji(&self, id: &PageId, emoji: &str) -> RepoResult<Page> {
        let emoji = match emoji.trim() {
            "" => DEFAULT_EMOJI.to_string(),
            value => value.to_string(),
        };
        self.mutate(id, "page_set_emoji", |page| page.emoji = emoji)
    }

    /// Appends a tag unless an equal one is already present.
    pub fn add_tag(&self, id: &PageId, tag: &str) -> RepoResult<Page> {
        let tag = normalize_tag(tag)?;
        let mut page = self.get_page(id)?;
        if page.tags.contains(&tag) {
            return Ok(page);
        }
        page.tags.push(tag);
        self.store(page, "page_add_tag")
    }

    /// Removes a tag; removing an absent tag is a no-op.
    pub fn remove_tag(&self, id: &PageId, tag: &str) -> RepoResult<Page> {
        let tag = tag.trim();
        let mut page = self.get_page(id)?;
        let before = page.tags.len();
        page.tags.retain(|existing| existing != tag);
        if page.tags.len() == before {
            return Ok(page);
        }
        self.store(page, "page_remove_tag")
    }

    pub fn replace_tags(&self, id: &PageId, tags: &[String]) -> RepoResult<Page> {
        let tags = normalize_tags(tags)?;
        self.mutate(id, "page_replace_tags", |page| page.tags = tags)
    }

    /// Replaces the serialized document of a page.
    pub fn update_content(&self, id: &PageId, content: &str) -> RepoResult<Page> {
        self.mutate(id, "page_update_content", |page| {
            page.content = content.to_string()
        })
    }

    pub fn delete_page(&self, id: &PageId) -> RepoResult<()> {
        self.repo.delete_page(id)?;
        info!("event=page_delete module=page status=ok page_id={}", id);
        Ok(())
    }

    fn mutate(&self, id: &PageId, event: &str, apply: impl FnOnce(&mut Page)) -> RepoResult<Page> {
        let mut page = self.get_page(id)?;
        apply(&mut page);
        self.store(page, event)
    }

    fn store(&self, mut page: Page, event: &str) -> RepoResult<Page> {
        page.touch(self.clock.now_ms());
        self.repo.update_page(&page)?;
        info!(
            "event={} module=page status=ok page_id={} tag_count={}",
            event,
            page.id,
            page.tags.len()
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::page::PageValidationError;
    use crate::repo::kv_store::{MemoryStore, StorageKeys};
    use crate::repo::page_repo::KvPageRepository;
    use crate::service::clock::ManualClock;

    fn service(clock: &ManualClock) -> PageService<KvPageRepository<MemoryStore>, ManualClock> {
        PageService::new(
            KvPageRepository::new(MemoryStore::new(), StorageKeys::default()),
            clock.clone(),
        )
    }

    #[test]
    fn create_then_rename_bumps_updated_at() {
        let clock = ManualClock::new(1_000);
        let service = service(&clock);
        let page = service.create_page("Notes", None).unwrap();
        assert_eq!(page.emoji, DEFAULT_EMOJI);
        assert_eq!(page.created_at, page.updated_at);

        clock.advance(5);
        let renamed = service.rename_page(&page.id, " Notes v2 ").unwrap();
        assert_eq!(renamed.title, "Notes v2");
        assert!(renamed.updated_at > renamed.created_at);
    }

    #[test]
    fn blank_title_is_rejected_and_nothing_is_stored() {
        let clock = ManualClock::new(0);
        let service = service(&clock);
        assert!(matches!(
            service.create_page("  ", None),
            Err(RepoError::Validation(PageValidationError::BlankTitle))
        ));
        assert!(service.list_pages().unwrap().is_empty());
    }

    #[test]
    fn tags_are_trimmed_deduplicated_and_ordered() {
        let clock = ManualClock::new(0);
        let service = service(&clock);
        let page = service.create_page("Tags", None).unwrap();
        service.add_tag(&page.id, " work ").unwrap();
        service.add_tag(&page.id, "home").unwrap();
        let page_after = service.add_tag(&page.id, "work").unwrap();
        assert_eq!(page_after.tags, vec!["work", "home"]);

        let removed = service.remove_tag(&page.id, "work").unwrap();
        assert_eq!(removed.tags, vec!["home"]);
        assert!(matches!(
            service.add_tag(&page.id, " "),
            Err(RepoError::Validation(PageValidationError::BlankTag))
        ));
    }

    #[test]
    fn operations_on_missing_page_are_not_found() {
        let clock = ManualClock::new(0);
        let service = service(&clock);
        let missing = PageId::from("missing");
        assert!(matches!(service.get_page(&missing), Err(RepoError::NotFound(_))));
        assert!(matches!(
            service.set_emoji(&missing, "🔥"),
            Err(RepoError::NotFound(_))
        ));
        assert!(matches!(service.delete_page(&missing), Err(RepoError::NotFound(_))));
    }
}
