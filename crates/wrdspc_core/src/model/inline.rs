//! Inline text runs and run-sequence editing primitives.
//!
//! # Responsibility
//! - Define styled text runs, the only inline leaf of a document.
//! - Provide offset-based split/style/insert/remove helpers over run lists.
//!
//! # Invariants
//! - Offsets are counted in chars, never bytes.
//! - `normalize_runs` leaves no empty runs and no adjacent runs with equal
//!   style.

/// Character-level formatting carried by one text run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// Link target when the run is part of a hyperlink.
    pub link: Option<String>,
    /// CSS color value, stored verbatim.
    pub color: Option<String>,
}

impl InlineStyle {
    /// Returns whether no attribute is set.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// Styled text leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: InlineStyle,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: InlineStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: InlineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Which side of an offset to read the style from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// Character before the offset (typing continuation).
    Backward,
    /// Character at the offset (start of a forward range).
    Forward,
}

/// Total length in chars of a run sequence.
pub fn runs_len(runs: &[TextRun]) -> usize {
    runs.iter().map(TextRun::char_len).sum()
}

/// Concatenated text of a run sequence.
pub fn runs_text(runs: &[TextRun]) -> String {
    runs.iter().map(|run| run.text.as_str()).collect()
}

/// Returns the style of the character adjacent to `offset`.
///
/// Falls back to the other side when the preferred side is out of range.
/// Returns `None` for an empty sequence.
pub fn style_at(runs: &[TextRun], offset: usize, affinity: Affinity) -> Option<&InlineStyle> {
    let len = runs_len(runs);
    if len == 0 {
        return None;
    }
    let char_index = match affinity {
        Affinity::Backward if offset > 0 => offset - 1,
        Affinity::Backward => 0,
        Affinity::Forward if offset < len => offset,
        Affinity::Forward => len - 1,
    };
    let mut start = 0;
    for run in runs {
        let end = start + run.char_len();
        if char_index < end {
            return Some(&run.style);
        }
        start = end;
    }
    None
}

/// Ensures a run boundary at `offset` and returns the index of the first
/// run starting at or after it.
pub fn split_at(runs: &mut Vec<TextRun>, offset: usize) -> usize {
    let mut start = 0;
    for index in 0..runs.len() {
        let len = runs[index].char_len();
        if offset == start {
            return index;
        }
        if offset < start + len {
            let byte = byte_index(&runs[index].text, offset - start);
            let tail = runs[index].text.split_off(byte);
            let style = runs[index].style.clone();
            runs.insert(index + 1, TextRun::styled(tail, style));
            return index + 1;
        }
        start += len;
    }
    runs.len()
}

/// Applies `update` to the style of every char in `start..end`.
pub fn update_style_range(
    runs: &mut Vec<TextRun>,
    start: usize,
    end: usize,
    mut update: impl FnMut(&mut InlineStyle),
) {
    if start >= end {
        return;
    }
    split_at(runs, start);
    split_at(runs, end);
    let first = index_at_offset(runs, start);
    let last = index_at_offset(runs, end);
    for run in &mut runs[first..last] {
        update(&mut run.style);
    }
    normalize_runs(runs);
}

/// Removes chars in `start..end`.
pub fn remove_range(runs: &mut Vec<TextRun>, start: usize, end: usize) {
    if start >= end {
        return;
    }
    split_at(runs, start);
    split_at(runs, end);
    let first = index_at_offset(runs, start);
    let last = index_at_offset(runs, end);
    runs.drain(first..last);
    normalize_runs(runs);
}

/// Inserts `text` at `offset` with the given style.
pub fn insert_text(runs: &mut Vec<TextRun>, offset: usize, text: &str, style: InlineStyle) {
    if text.is_empty() {
        return;
    }
    let index = split_at(runs, offset);
    runs.insert(index, TextRun::styled(text, style));
    normalize_runs(runs);
}

/// Splits the sequence at `offset`, returning the tail.
pub fn split_off(runs: &mut Vec<TextRun>, offset: usize) -> Vec<TextRun> {
    let index = split_at(runs, offset);
    let tail = runs.split_off(index);
    normalize_runs(runs);
    tail
}

/// Returns the bounds of the whitespace-delimited word touching `offset`.
///
/// Returns `None` when both neighbours of `offset` are whitespace or the
/// sequence is empty.
pub fn word_bounds(runs: &[TextRun], offset: usize) -> Option<(usize, usize)> {
    let chars: Vec<char> = runs.iter().flat_map(|run| run.text.chars()).collect();
    let offset = offset.min(chars.len());
    let touches_left = offset > 0 && !chars[offset - 1].is_whitespace();
    let touches_right = offset < chars.len() && !chars[offset].is_whitespace();
    if !touches_left && !touches_right {
        return None;
    }
    let mut start = offset;
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    let mut end = offset;
    while end < chars.len() && !chars[end].is_whitespace() {
        end += 1;
    }
    Some((start, end))
}

/// Merges adjacent runs with equal style and drops empty runs.
pub fn normalize_runs(runs: &mut Vec<TextRun>) {
    let mut merged: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        if run.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(previous) if previous.style == run.style => previous.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    *runs = merged;
}

fn index_at_offset(runs: &[TextRun], offset: usize) -> usize {
    let mut start = 0;
    for (index, run) in runs.iter().enumerate() {
        if start >= offset {
            return index;
        }
        start += run.char_len();
    }
    runs.len()
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> InlineStyle {
        InlineStyle {
            bold: true,
            ..InlineStyle::default()
        }
    }

    #[test]
    fn split_at_creates_boundary_inside_run() {
        let mut runs = vec![TextRun::plain("hello world")];
        let index = split_at(&mut runs, 5);
        assert_eq!(index, 1);
        assert_eq!(runs[0].text, "hello");
        assert_eq!(runs[1].text, " world");
    }

    #[test]
    fn split_at_handles_multibyte_chars() {
        let mut runs = vec![TextRun::plain("héllo")];
        split_at(&mut runs, 2);
        assert_eq!(runs[0].text, "hé");
        assert_eq!(runs[1].text, "llo");
    }

    #[test]
    fn update_style_range_bolds_middle_word() {
        let mut runs = vec![TextRun::plain("one two three")];
        update_style_range(&mut runs, 4, 7, |style| style.bold = true);
        assert_eq!(
            runs,
            vec![
                TextRun::plain("one "),
                TextRun::styled("two", bold()),
                TextRun::plain(" three"),
            ]
        );
    }

    #[test]
    fn remove_range_spans_runs_and_merges() {
        let mut runs = vec![
            TextRun::plain("ab"),
            TextRun::styled("cd", bold()),
            TextRun::plain("ef"),
        ];
        remove_range(&mut runs, 1, 5);
        assert_eq!(runs, vec![TextRun::plain("af")]);
    }

    #[test]
    fn style_at_respects_affinity_at_boundary() {
        let runs = vec![TextRun::plain("ab"), TextRun::styled("cd", bold())];
        assert!(!style_at(&runs, 2, Affinity::Backward).unwrap().bold);
        assert!(style_at(&runs, 2, Affinity::Forward).unwrap().bold);
        assert!(style_at(&[], 0, Affinity::Forward).is_none());
    }

    #[test]
    fn word_bounds_finds_word_under_cursor() {
        let runs = vec![TextRun::plain("foo bar baz")];
        assert_eq!(word_bounds(&runs, 5), Some((4, 7)));
        assert_eq!(word_bounds(&runs, 7), Some((4, 7)));
        assert_eq!(word_bounds(&[TextRun::plain("a  b")], 2), None);
    }
}
