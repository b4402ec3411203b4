//! Block tree of one page's rich-text content.
//!
//! # Responsibility
//! - Define the owned document tree (paragraphs, headings, code blocks,
//!   lists, tables, images) and its text containers.
//! - Address text containers with index paths and validate positions.
//!
//! # Invariants
//! - Every inline leaf is a `TextRun`.
//! - Lists contain only `ListItem`s; an item owns at most one sub-list.
//! - `TextPath` indices are resolved against the block kind they walk
//!   through, so a path is only meaningful for the document it came from.

use crate::model::inline::{normalize_runs, runs_len, runs_text, TextRun};
use crate::model::selection::Position;

/// Heading level in `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Returns `None` outside `1..=6`.
    pub fn new(level: u8) -> Option<Self> {
        (1..=6).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Bullet,
    Ordered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub kind: ListKind,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub inlines: Vec<TextRun>,
    pub sublist: Option<List>,
}

impl ListItem {
    pub fn new(inlines: Vec<TextRun>) -> Self {
        Self {
            inlines,
            sublist: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableCell {
    pub inlines: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<TableCell>>,
}

impl Table {
    /// Builds an empty `rows` x `cols` table.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows: vec![vec![TableCell::default(); cols]; rows],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<TextRun>),
    Heading {
        level: HeadingLevel,
        inlines: Vec<TextRun>,
    },
    List(List),
    Table(Table),
    Image {
        src: String,
        alt: String,
    },
    /// Preformatted code; whitespace in its runs is significant.
    CodeBlock(Vec<TextRun>),
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph(vec![TextRun::plain(text)])
    }
}

/// Index path to one text container.
///
/// - `[b]`: paragraph, heading or code block at top-level block `b`.
/// - `[b, i0, i1, ..]`: list item `i0` of list `b`, then item `i1` of its
///   sub-list, and so on.
/// - `[b, row, col]`: table cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextPath(pub Vec<usize>);

impl TextPath {
    pub fn top(block: usize) -> Self {
        Self(vec![block])
    }

    pub fn block_index(&self) -> usize {
        self.0.first().copied().unwrap_or(0)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

/// Owned rich-text document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.text_paths()
            .iter()
            .all(|path| self.text_len(path) == Some(0))
            && !self
                .blocks
                .iter()
                .any(|block| matches!(block, Block::Image { .. } | Block::Table(_)))
    }

    /// Lists every text container in document order.
    pub fn text_paths(&self) -> Vec<TextPath> {
        let mut paths = Vec::new();
        for (index, block) in self.blocks.iter().enumerate() {
            match block {
                Block::Paragraph(_) | Block::Heading { .. } | Block::CodeBlock(_) => {
                    paths.push(TextPath::top(index))
                }
                Block::List(list) => collect_list_paths(list, vec![index], &mut paths),
                Block::Table(table) => {
                    for (row_index, row) in table.rows.iter().enumerate() {
                        for col_index in 0..row.len() {
                            paths.push(TextPath(vec![index, row_index, col_index]));
                        }
                    }
                }
                Block::Image { .. } => {}
            }
        }
        paths
    }

    pub fn inlines(&self, path: &TextPath) -> Option<&Vec<TextRun>> {
        let (&first, rest) = path.0.split_first()?;
        match self.blocks.get(first)? {
            Block::Paragraph(inlines) | Block::Heading { inlines, .. } | Block::CodeBlock(inlines) => {
                rest.is_empty().then_some(inlines)
            }
            Block::List(list) => list_item(list, rest).map(|item| &item.inlines),
            Block::Table(table) => match rest {
                [row, col] => table
                    .rows
                    .get(*row)
                    .and_then(|cells| cells.get(*col))
                    .map(|cell| &cell.inlines),
                _ => None,
            },
            Block::Image { .. } => None,
        }
    }

    pub fn inlines_mut(&mut self, path: &TextPath) -> Option<&mut Vec<TextRun>> {
        let (&first, rest) = path.0.split_first()?;
        match self.blocks.get_mut(first)? {
            Block::Paragraph(inlines) | Block::Heading { inlines, .. } | Block::CodeBlock(inlines) => {
                if rest.is_empty() {
                    Some(inlines)
                } else {
                    None
                }
            }
            Block::List(list) => list_item_mut(list, rest).map(|item| &mut item.inlines),
            Block::Table(table) => match rest {
                [row, col] => table
                    .rows
                    .get_mut(*row)
                    .and_then(|cells| cells.get_mut(*col))
                    .map(|cell| &mut cell.inlines),
                _ => None,
            },
            Block::Image { .. } => None,
        }
    }

    pub fn text_len(&self, path: &TextPath) -> Option<usize> {
        self.inlines(path).map(|runs| runs_len(runs))
    }

    pub fn text_at(&self, path: &TextPath) -> Option<String> {
        self.inlines(path).map(|runs| runs_text(runs))
    }

    /// Returns whether `position` resolves inside the current tree.
    pub fn contains_position(&self, position: &Position) -> bool {
        self.text_len(&position.path)
            .is_some_and(|len| position.offset <= len)
    }

    /// Document-order index of a text container.
    pub fn flat_index(&self, path: &TextPath) -> Option<usize> {
        self.text_paths().iter().position(|candidate| candidate == path)
    }

    /// Merges adjacent equal-style runs and drops empty ones everywhere.
    pub fn normalize(&mut self) {
        for path in self.text_paths() {
            if let Some(runs) = self.inlines_mut(&path) {
                normalize_runs(runs);
            }
        }
    }

    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.normalize();
        copy
    }
}

pub(crate) fn list_item<'a>(list: &'a List, indices: &[usize]) -> Option<&'a ListItem> {
    let (&first, rest) = indices.split_first()?;
    let item = list.items.get(first)?;
    if rest.is_empty() {
        Some(item)
    } else {
        list_item(item.sublist.as_ref()?, rest)
    }
}

pub(crate) fn list_item_mut<'a>(list: &'a mut List, indices: &[usize]) -> Option<&'a mut ListItem> {
    let (&first, rest) = indices.split_first()?;
    let item = list.items.get_mut(first)?;
    if rest.is_empty() {
        Some(item)
    } else {
        list_item_mut(item.sublist.as_mut()?, rest)
    }
}

/// Resolves the list that directly holds the item at `indices`.
pub(crate) fn parent_list_mut<'a>(list: &'a mut List, indices: &[usize]) -> Option<&'a mut List> {
    match indices {
        [] => None,
        [_] => Some(list),
        [first, rest @ ..] => {
            let sublist = list.items.get_mut(*first)?.sublist.as_mut()?;
            parent_list_mut(sublist, rest)
        }
    }
}

fn collect_list_paths(list: &List, prefix: Vec<usize>, paths: &mut Vec<TextPath>) {
    for (index, item) in list.items.iter().enumerate() {
        let mut path = prefix.clone();
        path.push(index);
        paths.push(TextPath(path.clone()));
        if let Some(sublist) = &item.sublist {
            collect_list_paths(sublist, path, paths);
        }
    }
}
