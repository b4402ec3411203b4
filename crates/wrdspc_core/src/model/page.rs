//! Page domain model.
//!
//! # Responsibility
//! - Define the persisted page record (metadata plus serialized document).
//! - Own title/tag validation and normalization rules.
//!
//! # Invariants
//! - `id` is generated once and never reused for another page.
//! - `title` is never blank once validated.
//! - `updated_at >= created_at`.
//! - `tags` are trimmed, non-blank and unique, in insertion order.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Emoji assigned to new pages when the caller does not pick one.
pub const DEFAULT_EMOJI: &str = "📝";

/// Stable page identifier, serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for PageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageValidationError {
    BlankTitle,
    BlankTag,
    InvalidTimestamps { created_at: i64, updated_at: i64 },
}

impl Display for PageValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "page title cannot be blank"),
            Self::BlankTag => write!(f, "tag cannot be blank"),
            Self::InvalidTimestamps {
                created_at,
                updated_at,
            } => write!(
                f,
                "updatedAt ({updated_at}) must be >= createdAt ({created_at})"
            ),
        }
    }
}

impl Error for PageValidationError {}

/// One note: metadata plus its serialized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub title: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    /// Serialized HTML fragment; empty for a fresh page.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

impl Page {
    /// Creates a page with a generated id and both timestamps at `now_ms`.
    pub fn new(
        title: &str,
        emoji: Option<&str>,
        now_ms: i64,
    ) -> Result<Self, PageValidationError> {
        Ok(Self {
            id: PageId::generate(),
            title: normalize_title(title)?,
            emoji: emoji
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_EMOJI)
                .to_string(),
            content: String::new(),
            tags: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
        })
    }

    pub fn validate(&self) -> Result<(), PageValidationError> {
        if self.title.trim().is_empty() {
            return Err(PageValidationError::BlankTitle);
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(PageValidationError::BlankTag);
        }
        if self.updated_at < self.created_at {
            return Err(PageValidationError::InvalidTimestamps {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Records a mutation at `now_ms`.
    ///
    /// `updated_at` strictly increases even when the clock has not moved.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms.max(self.updated_at.saturating_add(1));
    }
}

/// Trims a title and rejects blank values.
pub fn normalize_title(title: &str) -> Result<String, PageValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(PageValidationError::BlankTitle);
    }
    Ok(trimmed.to_string())
}

/// Trims one tag and rejects blank values.
pub fn normalize_tag(tag: &str) -> Result<String, PageValidationError> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(PageValidationError::BlankTag);
    }
    Ok(trimmed.to_string())
}

/// Normalizes and deduplicates tags, keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, PageValidationError> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let value = normalize_tag(tag)?;
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    Ok(unique)
}

fn default_emoji() -> String {
    DEFAULT_EMOJI.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_page_has_equal_timestamps_and_default_emoji() {
        let page = Page::new("  Notes ", None, 1_000).unwrap();
        assert_eq!(page.title, "Notes");
        assert_eq!(page.emoji, DEFAULT_EMOJI);
        assert_eq!(page.created_at, page.updated_at);
        assert!(page.tags.is_empty());
    }

    #[test]
    fn new_page_rejects_blank_title() {
        assert_eq!(
            Page::new("   ", None, 0).unwrap_err(),
            PageValidationError::BlankTitle
        );
    }

    #[test]
    fn touch_always_advances_updated_at() {
        let mut page = Page::new("Notes", None, 1_000).unwrap();
        page.touch(1_000);
        assert_eq!(page.updated_at, 1_001);
        page.touch(500);
        assert_eq!(page.updated_at, 1_002);
        page.touch(5_000);
        assert_eq!(page.updated_at, 5_000);

        page.updated_at = i64::MAX;
        page.touch(0);
        assert_eq!(page.updated_at, i64::MAX);
    }

    #[test]
    fn normalize_tags_trims_and_dedupes_in_order() {
        let tags = vec![" work ".to_string(), "Home".to_string(), "work".to_string()];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["work", "Home"]);
        assert_eq!(
            normalize_tags(&[" ".to_string()]).unwrap_err(),
            PageValidationError::BlankTag
        );
    }

    #[test]
    fn legacy_entry_without_content_or_tags_deserializes() {
        let value = serde_json::json!({ "id": "1700000000000", "title": "Old", "emoji": "📓" });
        let page: Page = serde_json::from_value(value).unwrap();
        assert_eq!(page.id.as_str(), "1700000000000");
        assert!(page.content.is_empty());
        assert!(page.tags.is_empty());
    }

    #[test]
    fn serialization_uses_camel_case_wire_fields() {
        let page = Page::new("Notes", Some("📝"), 42).unwrap();
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["createdAt"], 42);
        assert_eq!(json["updatedAt"], 42);
        assert_eq!(json["id"], page.id.as_str());
    }
}
