//! Formatting command dispatcher.
//!
//! # Responsibility
//! - Apply one `FormatCommand` to an owned `Document` at a `Selection`.
//! - Report what happened and hand back the new serialization so callers
//!   can schedule a save.
//!
//! # Invariants
//! - Toggles read the active formats at the selection anchor: active means
//!   remove, inactive means apply.
//! - A command that leaves the normalized document unchanged reports
//!   `Unchanged`; a blank link or image URL reports `Cancelled` and never
//!   mutates.
//! - The returned selection always resolves in the mutated document.
//!
//! # See also
//! - `editor::outline` for list/heading/indent rewrites.

use crate::editor::command::FormatCommand;
use crate::editor::outline::{LineKind, Outline};
use crate::editor::resolver::{resolve_active_formats, ActiveFormats};
use crate::editor::tracker::ancestor_chain;
use crate::html::{to_html, to_plain_text};
use crate::model::document::{Block, Document, HeadingLevel, ListKind, Table, TextPath};
use crate::model::inline::{
    insert_text, remove_range, style_at, update_style_range, word_bounds, Affinity, InlineStyle,
    TextRun,
};
use crate::model::selection::{Position, Selection};
use chrono::NaiveDateTime;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DATE_FORMAT: &str = "%-m/%-d/%Y";
const TIME_FORMAT: &str = "%-I:%M:%S %p";
const CHECKBOX_MARKER: &str = "\u{2610} ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// A format was applied or content was inserted.
    Applied,
    /// An active format was removed.
    Removed,
    /// The command had nothing to act on.
    Unchanged,
    /// A required payload was blank; nothing happened.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    /// Selection to restore after the edit.
    pub selection: Selection,
    pub html: String,
    pub text: String,
}

impl DispatchOutcome {
    /// Returns whether the document was mutated and needs saving.
    pub fn changed(&self) -> bool {
        matches!(self.status, DispatchStatus::Applied | DispatchStatus::Removed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Selection endpoint does not resolve in the document.
    InvalidSelection,
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSelection => write!(f, "selection does not resolve in the document"),
        }
    }
}

impl Error for DispatchError {}

/// Applies `command` to `doc` at `selection`.
///
/// `now` is the invocation time used by date/time insertion.
pub fn dispatch(
    doc: &mut Document,
    selection: &Selection,
    command: &FormatCommand,
    now: NaiveDateTime,
) -> Result<DispatchOutcome, DispatchError> {
    let (start, end) = selection
        .ordered(doc)
        .ok_or(DispatchError::InvalidSelection)?;
    let affinity = selection.anchor_affinity(doc);
    let active = ancestor_chain(doc, &selection.anchor, affinity)
        .map(|chain| resolve_active_formats(&chain))
        .unwrap_or_default();

    let before = doc.normalized();
    let range = Range {
        start,
        end,
        selection: selection.clone(),
    };

    let (status, next) = match command {
        FormatCommand::Bold => toggle_inline(doc, &range, active.bold, |style, on| style.bold = on),
        FormatCommand::Italic => {
            toggle_inline(doc, &range, active.italic, |style, on| style.italic = on)
        }
        FormatCommand::Underline => {
            toggle_inline(doc, &range, active.underline, |style, on| style.underline = on)
        }
        FormatCommand::Strikethrough => toggle_inline(doc, &range, active.strikethrough, |style, on| {
            style.strikethrough = on
        }),
        FormatCommand::Color(color) => apply_color(doc, &range, color.as_deref()),
        FormatCommand::Link { url } => apply_link(doc, &range, url),
        FormatCommand::Unlink => remove_link(doc, &range),
        FormatCommand::Checkbox => insert_inline_text(doc, &range, CHECKBOX_MARKER),
        FormatCommand::InsertDate => {
            insert_inline_text(doc, &range, &now.format(DATE_FORMAT).to_string())
        }
        FormatCommand::InsertTime => {
            insert_inline_text(doc, &range, &now.format(TIME_FORMAT).to_string())
        }
        FormatCommand::Image { src, alt } => {
            let src = src.trim();
            if src.is_empty() {
                (DispatchStatus::Cancelled, range.selection.clone())
            } else {
                let image = Block::Image {
                    src: src.to_string(),
                    alt: alt.clone(),
                };
                insert_block(doc, &range, image)
            }
        }
        FormatCommand::Table { rows, cols } => {
            let table = Block::Table(Table::empty((*rows).max(1), (*cols).max(1)));
            insert_block(doc, &range, table)
        }
        FormatCommand::BulletList => rewrite_lines(doc, &range, |outline, covered| {
            toggle_list(outline, covered, &active, ListKind::Bullet)
        }),
        FormatCommand::OrderedList => rewrite_lines(doc, &range, |outline, covered| {
            toggle_list(outline, covered, &active, ListKind::Ordered)
        }),
        FormatCommand::Heading(level) => rewrite_lines(doc, &range, |outline, covered| {
            toggle_heading(outline, covered, &active, *level)
        }),
        FormatCommand::CodeBlock => rewrite_lines(doc, &range, |outline, covered| {
            toggle_code_block(outline, covered, &active)
        }),
        FormatCommand::Paragraph => rewrite_lines(doc, &range, |outline, covered| {
            for &index in covered {
                outline.lines[index].set_kind(LineKind::Paragraph);
            }
            DispatchStatus::Applied
        }),
        FormatCommand::Indent | FormatCommand::Outdent if active.list.is_none() => {
            (DispatchStatus::Unchanged, range.selection.clone())
        }
        FormatCommand::Indent => rewrite_lines(doc, &range, indent),
        FormatCommand::Outdent => rewrite_lines(doc, &range, outdent),
    };

    doc.normalize();
    let status = if status != DispatchStatus::Cancelled && *doc == before {
        DispatchStatus::Unchanged
    } else {
        status
    };
    let selection = if next.is_valid_in(doc) {
        next
    } else {
        fallback_selection(doc)
    };

    Ok(DispatchOutcome {
        status,
        selection,
        html: to_html(doc),
        text: to_plain_text(doc),
    })
}

struct Range {
    start: Position,
    end: Position,
    selection: Selection,
}

impl Range {
    fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Selected span of one text container.
struct Segment {
    path: TextPath,
    start: usize,
    end: usize,
}

fn segments(doc: &Document, start: &Position, end: &Position) -> Vec<Segment> {
    let paths = doc.text_paths();
    let first = paths.iter().position(|path| *path == start.path);
    let last = paths.iter().position(|path| *path == end.path);
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };
    paths[first..=last]
        .iter()
        .map(|path| Segment {
            path: path.clone(),
            start: if *path == start.path { start.offset } else { 0 },
            end: if *path == end.path {
                end.offset
            } else {
                doc.text_len(path).unwrap_or(0)
            },
        })
        .collect()
}

/// Selected segments, or the word around a collapsed caret.
fn target_segments(doc: &Document, range: &Range) -> Vec<Segment> {
    if !range.is_collapsed() {
        return segments(doc, &range.start, &range.end);
    }
    let Some(runs) = doc.inlines(&range.start.path) else {
        return Vec::new();
    };
    match word_bounds(runs, range.start.offset) {
        Some((start, end)) => vec![Segment {
            path: range.start.path.clone(),
            start,
            end,
        }],
        None => Vec::new(),
    }
}

fn update_segments(doc: &mut Document, segments: &[Segment], mut update: impl FnMut(&mut InlineStyle)) {
    for segment in segments {
        if let Some(runs) = doc.inlines_mut(&segment.path) {
            update_style_range(runs, segment.start, segment.end, &mut update);
        }
    }
}

fn toggle_inline(
    doc: &mut Document,
    range: &Range,
    active: bool,
    set: impl Fn(&mut InlineStyle, bool),
) -> (DispatchStatus, Selection) {
    let targets = target_segments(doc, range);
    if targets.is_empty() {
        return (DispatchStatus::Unchanged, range.selection.clone());
    }
    let on = !active;
    update_segments(doc, &targets, |style| set(style, on));
    let status = if on {
        DispatchStatus::Applied
    } else {
        DispatchStatus::Removed
    };
    (status, range.selection.clone())
}

fn apply_color(doc: &mut Document, range: &Range, color: Option<&str>) -> (DispatchStatus, Selection) {
    let targets = target_segments(doc, range);
    let color = color.map(str::trim).filter(|value| !value.is_empty());
    update_segments(doc, &targets, |style| style.color = color.map(str::to_string));
    let status = if color.is_some() {
        DispatchStatus::Applied
    } else {
        DispatchStatus::Removed
    };
    (status, range.selection.clone())
}

fn apply_link(doc: &mut Document, range: &Range, url: &str) -> (DispatchStatus, Selection) {
    let url = url.trim();
    if url.is_empty() {
        return (DispatchStatus::Cancelled, range.selection.clone());
    }

    if !range.is_collapsed() {
        let targets = segments(doc, &range.start, &range.end);
        update_segments(doc, &targets, |style| style.link = Some(url.to_string()));
        return (DispatchStatus::Applied, range.selection.clone());
    }

    let caret = &range.start;
    let Some(runs) = doc.inlines_mut(&caret.path) else {
        return (DispatchStatus::Unchanged, range.selection.clone());
    };
    if let Some((start, end)) = link_extent(runs, caret.offset) {
        update_style_range(runs, start, end, |style| style.link = Some(url.to_string()));
        return (DispatchStatus::Applied, range.selection.clone());
    }

    // No text to link: insert the URL itself as the link text.
    let mut style = style_at(runs, caret.offset, Affinity::Backward)
        .cloned()
        .unwrap_or_default();
    style.link = Some(url.to_string());
    insert_text(runs, caret.offset, url, style);
    let after = Position::new(caret.path.clone(), caret.offset + url.chars().count());
    (DispatchStatus::Applied, Selection::collapsed(after))
}

fn remove_link(doc: &mut Document, range: &Range) -> (DispatchStatus, Selection) {
    let targets = if range.is_collapsed() {
        doc.inlines(&range.start.path)
            .and_then(|runs| link_extent(runs, range.start.offset))
            .map(|(start, end)| {
                vec![Segment {
                    path: range.start.path.clone(),
                    start,
                    end,
                }]
            })
            .unwrap_or_default()
    } else {
        segments(doc, &range.start, &range.end)
    };
    update_segments(doc, &targets, |style| style.link = None);
    (DispatchStatus::Removed, range.selection.clone())
}

/// Char bounds of the hyperlink touching `offset`.
fn link_extent(runs: &[TextRun], offset: usize) -> Option<(usize, usize)> {
    let mut bounds = Vec::with_capacity(runs.len());
    let mut cursor = 0;
    for run in runs {
        let end = cursor + run.char_len();
        bounds.push((cursor, end));
        cursor = end;
    }
    let hit = runs.iter().zip(&bounds).position(|(run, &(start, end))| {
        run.style.link.is_some() && start < end && start <= offset && offset <= end
    })?;
    let href = runs[hit].style.link.as_ref();
    let mut first = hit;
    while first > 0 && runs[first - 1].style.link.as_ref() == href {
        first -= 1;
    }
    let mut last = hit;
    while last + 1 < runs.len() && runs[last + 1].style.link.as_ref() == href {
        last += 1;
    }
    Some((bounds[first].0, bounds[last].1))
}

/// Deletes the selected content and returns the collapsed caret.
///
/// Ranges across containers clear every covered container; when both ends
/// sit in top-level paragraphs or headings the end block is merged into the
/// start block and the blocks between them are dropped.
fn delete_selection(doc: &mut Document, start: &Position, end: &Position) -> Position {
    if start == end {
        return start.clone();
    }
    if start.path == end.path {
        if let Some(runs) = doc.inlines_mut(&start.path) {
            remove_range(runs, start.offset, end.offset);
        }
        return start.clone();
    }

    for segment in segments(doc, start, end) {
        if let Some(runs) = doc.inlines_mut(&segment.path) {
            remove_range(runs, segment.start, segment.end);
        }
    }

    let top_level = start.path.indices().len() == 1 && end.path.indices().len() == 1;
    let (first, last) = (start.path.block_index(), end.path.block_index());
    if top_level && last > first {
        let tail = match doc.blocks.get_mut(last) {
            Some(
                Block::Paragraph(inlines) | Block::Heading { inlines, .. } | Block::CodeBlock(inlines),
            ) => std::mem::take(inlines),
            _ => Vec::new(),
        };
        if let Some(
            Block::Paragraph(inlines) | Block::Heading { inlines, .. } | Block::CodeBlock(inlines),
        ) = doc.blocks.get_mut(first)
        {
            inlines.extend(tail);
        }
        doc.blocks.drain(first + 1..=last);
    }
    start.clone()
}

fn insert_inline_text(doc: &mut Document, range: &Range, text: &str) -> (DispatchStatus, Selection) {
    let caret = delete_selection(doc, &range.start, &range.end);
    let Some(runs) = doc.inlines_mut(&caret.path) else {
        return (DispatchStatus::Unchanged, range.selection.clone());
    };
    let style = style_at(runs, caret.offset, Affinity::Backward)
        .cloned()
        .unwrap_or_default();
    insert_text(runs, caret.offset, text, style);
    let after = Position::new(caret.path, caret.offset + text.chars().count());
    (DispatchStatus::Applied, Selection::collapsed(after))
}

fn insert_block(doc: &mut Document, range: &Range, block: Block) -> (DispatchStatus, Selection) {
    let caret = delete_selection(doc, &range.start, &range.end);
    let index = (caret.path.block_index() + 1).min(doc.blocks.len());
    doc.blocks.insert(index, block);
    (DispatchStatus::Applied, Selection::collapsed(caret))
}

/// Runs a per-line rewrite over the text lines the selection covers.
///
/// A multi-container range ending at offset 0 does not cover its last
/// container. Selection endpoints are carried across the rebuild by their
/// document-order index.
fn rewrite_lines(
    doc: &mut Document,
    range: &Range,
    rewrite: impl FnOnce(&mut Outline, &[usize]) -> DispatchStatus,
) -> (DispatchStatus, Selection) {
    let (Some(first), Some(last), Some(anchor), Some(focus)) = (
        doc.flat_index(&range.start.path),
        doc.flat_index(&range.end.path),
        doc.flat_index(&range.selection.anchor.path),
        doc.flat_index(&range.selection.focus.path),
    ) else {
        return (DispatchStatus::Unchanged, range.selection.clone());
    };
    let last = if last > first && range.end.offset == 0 {
        last - 1
    } else {
        last
    };

    let mut outline = Outline::from_blocks(std::mem::take(&mut doc.blocks));
    let covered = outline.covered(first, last);
    let status = rewrite(&mut outline, &covered);
    doc.blocks = outline.into_blocks();

    let paths = doc.text_paths();
    let remap = |flat: usize, position: &Position| {
        let path = paths.get(flat).cloned().unwrap_or_else(|| position.path.clone());
        Position::new(path, position.offset)
    };
    let selection = Selection::new(
        remap(anchor, &range.selection.anchor),
        remap(focus, &range.selection.focus),
    );
    (status, selection)
}

fn toggle_list(
    outline: &mut Outline,
    covered: &[usize],
    active: &ActiveFormats,
    kind: ListKind,
) -> DispatchStatus {
    if active.list == Some(kind) {
        for &index in covered {
            if outline.lines[index].item().is_some() {
                outline.lines[index].set_kind(LineKind::Paragraph);
            }
        }
        return DispatchStatus::Removed;
    }

    for &index in covered {
        match outline.lines[index].item() {
            Some((_, current)) if current == kind => {}
            Some(_) => switch_sibling_kind(outline, index, kind),
            None => outline.lines[index].set_kind(LineKind::Item { depth: 0, kind }),
        }
    }
    DispatchStatus::Applied
}

/// Switches every sibling of the item at `index` (its enclosing list) to
/// `kind`.
fn switch_sibling_kind(outline: &mut Outline, index: usize, kind: ListKind) {
    let Some((depth, _)) = outline.lines[index].item() else {
        return;
    };
    let mut first = index;
    while first > 0 {
        match outline.lines[first - 1].item() {
            Some((previous, _)) if previous >= depth => first -= 1,
            _ => break,
        }
    }
    let mut end = index + 1;
    while let Some((next, _)) = outline.lines.get(end).and_then(|line| line.item()) {
        if next < depth {
            break;
        }
        end += 1;
    }
    for line in &mut outline.lines[first..end] {
        if line.item().is_some_and(|(line_depth, _)| line_depth == depth) {
            line.set_kind(LineKind::Item { depth, kind });
        }
    }
}

fn toggle_heading(
    outline: &mut Outline,
    covered: &[usize],
    active: &ActiveFormats,
    level: HeadingLevel,
) -> DispatchStatus {
    let revert = active.heading == Some(level);
    let next = if revert {
        LineKind::Paragraph
    } else {
        LineKind::Heading(level)
    };
    for &index in covered {
        outline.lines[index].set_kind(next);
    }
    if revert {
        DispatchStatus::Removed
    } else {
        DispatchStatus::Applied
    }
}

fn toggle_code_block(outline: &mut Outline, covered: &[usize], active: &ActiveFormats) -> DispatchStatus {
    let next = if active.code_block {
        LineKind::Paragraph
    } else {
        LineKind::Code
    };
    for &index in covered {
        outline.lines[index].set_kind(next);
    }
    if active.code_block {
        DispatchStatus::Removed
    } else {
        DispatchStatus::Applied
    }
}

fn shift_depth(outline: &mut Outline, index: usize, deeper: bool) {
    if let Some((depth, kind)) = outline.lines[index].item() {
        let depth = if deeper {
            depth + 1
        } else {
            depth.saturating_sub(1)
        };
        outline.lines[index].set_kind(LineKind::Item { depth, kind });
    }
}

fn indent(outline: &mut Outline, covered: &[usize]) -> DispatchStatus {
    let mut shifted = vec![false; outline.lines.len()];
    for &index in covered {
        if shifted[index] {
            continue;
        }
        let Some((depth, _)) = outline.lines[index].item() else {
            continue;
        };
        // Needs a previous sibling (or its descendant) to nest under.
        let has_previous_sibling = index
            .checked_sub(1)
            .and_then(|previous| outline.lines[previous].item())
            .is_some_and(|(previous_depth, _)| previous_depth >= depth);
        if !has_previous_sibling {
            continue;
        }
        for line in index..outline.subtree_end(index) {
            if !shifted[line] {
                shift_depth(outline, line, true);
                shifted[line] = true;
            }
        }
    }
    DispatchStatus::Applied
}

fn outdent(outline: &mut Outline, covered: &[usize]) -> DispatchStatus {
    let mut shifted = vec![false; outline.lines.len()];
    for &index in covered {
        if shifted[index] {
            continue;
        }
        let Some((depth, _)) = outline.lines[index].item() else {
            continue;
        };
        let end = outline.subtree_end(index);
        if depth == 0 {
            outline.lines[index].set_kind(LineKind::Paragraph);
        } else {
            shift_depth(outline, index, false);
        }
        shifted[index] = true;
        for line in index + 1..end {
            if !shifted[line] {
                shift_depth(outline, line, false);
                shifted[line] = true;
            }
        }
    }
    DispatchStatus::Applied
}

fn fallback_selection(doc: &Document) -> Selection {
    let path = doc
        .text_paths()
        .into_iter()
        .next()
        .unwrap_or_else(|| TextPath::top(0));
    Selection::collapsed(Position::new(path, 0))
}
