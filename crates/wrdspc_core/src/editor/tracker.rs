//! Selection tracking.
//!
//! # Responsibility
//! - Cache the current range, its screen rectangle and the anchor's
//!   ancestor chain on every selection-change notification.
//!
//! # Invariants
//! - Only the anchor's chain is computed, even for multi-block ranges.
//! - A collapsed caret with no formatting context is reported as `None`.
//! - `update` has no side effects beyond the cache.

use crate::editor::ancestors::{AncestorTag, TagName};
use crate::editor::resolver::{resolve_active_formats, ActiveFormats};
use crate::model::document::{Block, Document, List, ListKind};
use crate::model::inline::{style_at, Affinity};
use crate::model::selection::{Position, Selection};

/// Screen-space rectangle reported by the host layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Cached view of the live selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedRange {
    pub selection: Selection,
    pub rect: Rect,
    /// Nearest-first, ending with `TagName::Root`.
    pub ancestors: Vec<AncestorTag>,
    pub active: ActiveFormats,
}

#[derive(Debug, Default)]
pub struct SelectionTracker {
    current: Option<TrackedRange>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the cached range for a selection-change notification.
    pub fn update(
        &mut self,
        doc: &Document,
        selection: Option<Selection>,
        rect: Option<Rect>,
    ) -> Option<&TrackedRange> {
        self.current = selection.and_then(|selection| track(doc, selection, rect));
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&TrackedRange> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

fn track(doc: &Document, selection: Selection, rect: Option<Rect>) -> Option<TrackedRange> {
    if !selection.is_valid_in(doc) {
        return None;
    }
    let affinity = selection.anchor_affinity(doc);
    let ancestors = ancestor_chain(doc, &selection.anchor, affinity)?;
    let active = resolve_active_formats(&ancestors);
    if selection.is_collapsed() && active.is_empty() {
        return None;
    }
    Some(TrackedRange {
        selection,
        rect: rect.unwrap_or_default(),
        ancestors,
        active,
    })
}

/// Builds the nearest-first ancestor chain for one position.
///
/// Returns `None` when the position does not resolve in `doc`.
pub fn ancestor_chain(
    doc: &Document,
    position: &Position,
    affinity: Affinity,
) -> Option<Vec<AncestorTag>> {
    if !doc.contains_position(position) {
        return None;
    }
    let runs = doc.inlines(&position.path)?;
    let mut chain = Vec::new();

    if let Some(style) = style_at(runs, position.offset, affinity) {
        if let Some(color) = &style.color {
            chain.push(AncestorTag::with_style(
                TagName::Span,
                format!("color: {color}"),
            ));
        }
        if style.strikethrough {
            chain.push(AncestorTag::new(TagName::S));
        }
        if style.underline {
            chain.push(AncestorTag::new(TagName::U));
        }
        if style.italic {
            chain.push(AncestorTag::new(TagName::Em));
        }
        if style.bold {
            chain.push(AncestorTag::new(TagName::Strong));
        }
        if style.link.is_some() {
            chain.push(AncestorTag::new(TagName::A));
        }
    }

    let (&block_index, rest) = position.path.indices().split_first()?;
    match doc.blocks.get(block_index)? {
        Block::Paragraph(_) => chain.push(AncestorTag::new(TagName::P)),
        Block::Heading { level, .. } => chain.push(AncestorTag::new(TagName::Heading(*level))),
        Block::CodeBlock(_) => {
            chain.push(AncestorTag::new(TagName::Code));
            chain.push(AncestorTag::new(TagName::Pre));
        }
        Block::List(list) => chain.extend(list_frames(list, rest)?),
        Block::Table(_) => {
            chain.push(AncestorTag::new(TagName::Td));
            chain.push(AncestorTag::new(TagName::Tr));
            chain.push(AncestorTag::new(TagName::Table));
        }
        Block::Image { .. } => return None,
    }
    chain.push(AncestorTag::new(TagName::Root));
    Some(chain)
}

/// Returns `li`/`ul|ol` pairs from the innermost item outwards.
fn list_frames(list: &List, indices: &[usize]) -> Option<Vec<AncestorTag>> {
    let mut frames = Vec::new();
    let mut current = list;
    for (depth, index) in indices.iter().enumerate() {
        frames.push(list_tag(current.kind));
        frames.push(AncestorTag::new(TagName::Li));
        let item = current.items.get(*index)?;
        if depth + 1 < indices.len() {
            current = item.sublist.as_ref()?;
        }
    }
    frames.reverse();
    Some(frames)
}

fn list_tag(kind: ListKind) -> AncestorTag {
    match kind {
        ListKind::Bullet => AncestorTag::new(TagName::Ul),
        ListKind::Ordered => AncestorTag::new(TagName::Ol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::{ListItem, TextPath};
    use crate::model::inline::{InlineStyle, TextRun};

    fn bold_word_doc() -> Document {
        Document::from_blocks(vec![Block::Paragraph(vec![
            TextRun::plain("say "),
            TextRun::styled(
                "hi",
                InlineStyle {
                    bold: true,
                    ..InlineStyle::default()
                },
            ),
        ])])
    }

    #[test]
    fn collapsed_caret_in_plain_paragraph_is_none() {
        let doc = bold_word_doc();
        let mut tracker = SelectionTracker::new();
        let caret = Selection::collapsed(Position::new(TextPath::top(0), 2));
        assert!(tracker.update(&doc, Some(caret), None).is_none());
    }

    #[test]
    fn range_over_bold_word_reports_rect_and_chain() {
        let doc = bold_word_doc();
        let mut tracker = SelectionTracker::new();
        let rect = Rect {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 12.0,
        };
        let range = tracker
            .update(&doc, Some(Selection::within(TextPath::top(0), 4, 6)), Some(rect))
            .expect("range should be tracked");
        assert_eq!(range.rect, rect);
        assert_eq!(
            range.ancestors,
            vec![
                AncestorTag::new(TagName::Strong),
                AncestorTag::new(TagName::P),
                AncestorTag::new(TagName::Root),
            ]
        );
        assert!(range.active.bold);
    }

    #[test]
    fn nested_list_chain_is_nearest_first() {
        let doc = Document::from_blocks(vec![Block::List(List {
            kind: ListKind::Bullet,
            items: vec![ListItem {
                inlines: vec![TextRun::plain("outer")],
                sublist: Some(List {
                    kind: ListKind::Ordered,
                    items: vec![ListItem::new(vec![TextRun::plain("inner")])],
                }),
            }],
        })]);
        let chain = ancestor_chain(
            &doc,
            &Position::new(TextPath(vec![0, 0, 0]), 1),
            Affinity::Backward,
        )
        .unwrap();
        let names: Vec<TagName> = chain.into_iter().map(|tag| tag.name).collect();
        assert_eq!(
            names,
            vec![
                TagName::Li,
                TagName::Ol,
                TagName::Li,
                TagName::Ul,
                TagName::Root
            ]
        );
    }

    #[test]
    fn invalid_selection_clears_cache() {
        let doc = bold_word_doc();
        let mut tracker = SelectionTracker::new();
        tracker.update(&doc, Some(Selection::within(TextPath::top(0), 4, 6)), None);
        assert!(tracker.current().is_some());
        tracker.update(&doc, Some(Selection::within(TextPath::top(3), 0, 1)), None);
        assert!(tracker.current().is_none());
    }
}
