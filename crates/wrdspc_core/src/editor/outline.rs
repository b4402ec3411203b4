//! Line-oriented view of a document used by block-level commands.
//!
//! Lists are flattened into items with an explicit depth, so list toggles,
//! heading changes and indent/outdent become per-line edits followed by a
//! rebuild. Tables and images pass through untouched.
//!
//! # Invariants
//! - Flatten/rebuild preserves the document order of text containers, so a
//!   flat text index stays valid across any per-line edit.
//! - Rebuild never produces a depth jump larger than one.

use crate::model::document::{Block, HeadingLevel, List, ListItem, ListKind, Table};
use crate::model::inline::TextRun;
use std::iter::Peekable;
use std::vec::IntoIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    Paragraph,
    Heading(HeadingLevel),
    Code,
    Item { depth: usize, kind: ListKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    Text {
        kind: LineKind,
        inlines: Vec<TextRun>,
    },
    /// Non-text block occupying `span` text indices (table cells).
    Opaque { block: Block, span: usize },
}

impl Line {
    pub(crate) fn item(&self) -> Option<(usize, ListKind)> {
        match self {
            Self::Text {
                kind: LineKind::Item { depth, kind },
                ..
            } => Some((*depth, *kind)),
            _ => None,
        }
    }

    pub(crate) fn set_kind(&mut self, next: LineKind) {
        if let Self::Text { kind, .. } = self {
            *kind = next;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Outline {
    pub(crate) lines: Vec<Line>,
}

impl Outline {
    pub(crate) fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut lines = Vec::new();
        for block in blocks {
            match block {
                Block::Paragraph(inlines) => lines.push(Line::Text {
                    kind: LineKind::Paragraph,
                    inlines,
                }),
                Block::Heading { level, inlines } => lines.push(Line::Text {
                    kind: LineKind::Heading(level),
                    inlines,
                }),
                Block::CodeBlock(inlines) => lines.push(Line::Text {
                    kind: LineKind::Code,
                    inlines,
                }),
                Block::List(list) => flatten_list(list, 0, &mut lines),
                Block::Table(table) => {
                    let span = table_span(&table);
                    lines.push(Line::Opaque {
                        block: Block::Table(table),
                        span,
                    });
                }
                image @ Block::Image { .. } => lines.push(Line::Opaque {
                    block: image,
                    span: 0,
                }),
            }
        }
        Self { lines }
    }

    /// Indices of text lines whose flat text index is in `first..=last`.
    pub(crate) fn covered(&self, first: usize, last: usize) -> Vec<usize> {
        let mut covered = Vec::new();
        let mut flat = 0;
        for (index, line) in self.lines.iter().enumerate() {
            match line {
                Line::Text { .. } => {
                    if flat >= first && flat <= last {
                        covered.push(index);
                    }
                    flat += 1;
                }
                Line::Opaque { span, .. } => flat += span,
            }
        }
        covered
    }

    /// End (exclusive) of the subtree rooted at item line `index`.
    pub(crate) fn subtree_end(&self, index: usize) -> usize {
        let Some((depth, _)) = self.lines.get(index).and_then(Line::item) else {
            return index + 1;
        };
        let mut end = index + 1;
        while let Some((child_depth, _)) = self.lines.get(end).and_then(Line::item) {
            if child_depth <= depth {
                break;
            }
            end += 1;
        }
        end
    }

    pub(crate) fn into_blocks(self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut group: Vec<Entry> = Vec::new();
        let mut base = 0;
        for line in self.lines {
            match line {
                Line::Text {
                    kind: LineKind::Item { depth, kind },
                    inlines,
                } => {
                    let effective = match group.last() {
                        None => {
                            base = depth;
                            0
                        }
                        Some(previous) => depth.saturating_sub(base).min(previous.depth + 1),
                    };
                    let root_kind = group.first().map(|entry| entry.kind);
                    if effective == 0 && root_kind.is_some_and(|root| root != kind) {
                        blocks.push(Block::List(build_list(std::mem::take(&mut group))));
                        base = depth;
                    }
                    group.push(Entry {
                        depth: effective,
                        kind,
                        inlines,
                    });
                }
                other => {
                    if !group.is_empty() {
                        blocks.push(Block::List(build_list(std::mem::take(&mut group))));
                    }
                    match other {
                        Line::Text {
                            kind: LineKind::Heading(level),
                            inlines,
                        } => blocks.push(Block::Heading { level, inlines }),
                        Line::Text {
                            kind: LineKind::Code,
                            inlines,
                        } => blocks.push(Block::CodeBlock(inlines)),
                        Line::Text { inlines, .. } => blocks.push(Block::Paragraph(inlines)),
                        Line::Opaque { block, .. } => blocks.push(block),
                    }
                }
            }
        }
        if !group.is_empty() {
            blocks.push(Block::List(build_list(group)));
        }
        blocks
    }
}

struct Entry {
    depth: usize,
    kind: ListKind,
    inlines: Vec<TextRun>,
}

fn flatten_list(list: List, depth: usize, lines: &mut Vec<Line>) {
    for item in list.items {
        lines.push(Line::Text {
            kind: LineKind::Item {
                depth,
                kind: list.kind,
            },
            inlines: item.inlines,
        });
        if let Some(sublist) = item.sublist {
            flatten_list(sublist, depth + 1, lines);
        }
    }
}

fn table_span(table: &Table) -> usize {
    table.rows.iter().map(Vec::len).sum()
}

fn build_list(entries: Vec<Entry>) -> List {
    let mut iter = entries.into_iter().peekable();
    build_level(&mut iter, 0)
}

fn build_level(iter: &mut Peekable<IntoIter<Entry>>, depth: usize) -> List {
    let kind = iter
        .peek()
        .map_or(ListKind::Bullet, |entry| entry.kind);
    let mut items = Vec::new();
    while let Some(entry) = iter.next_if(|entry| entry.depth == depth) {
        let mut item = ListItem::new(entry.inlines);
        if iter.peek().is_some_and(|next| next.depth > depth) {
            item.sublist = Some(build_level(iter, depth + 1));
        }
        items.push(item);
    }
    List { kind, items }
}
