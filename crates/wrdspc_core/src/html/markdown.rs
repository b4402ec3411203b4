//! Markdown export of page documents.
//!
//! Export only: there is no markdown import. Underline has no markdown
//! form and is written as inline `<u>` markup; text color is dropped.

use crate::model::document::{Block, Document, List, ListKind, Table};
use crate::model::inline::{runs_text, TextRun};

/// Renders a document as CommonMark with GitHub pipe tables and `~~` strikes.
///
/// Blocks are separated by a blank line; empty paragraphs are skipped.
pub fn to_markdown(doc: &Document) -> String {
    let mut sections = Vec::new();
    for block in &doc.blocks {
        let section = match block {
            Block::Paragraph(inlines) => format_inlines(inlines, ""),
            Block::Heading { level, inlines } => {
                let marker = "#".repeat(usize::from(level.get()));
                format!("{marker} {}", format_inlines(inlines, ""))
            }
            Block::CodeBlock(inlines) => format_code_block(&runs_text(inlines)),
            Block::List(list) => {
                let mut lines = Vec::new();
                push_list(list, "", &mut lines);
                lines.join("\n")
            }
            Block::Table(table) => format_table(table),
            Block::Image { src, alt } => format!("![{}]({})", escape_text(alt), escape_url(src)),
        };
        if !section.trim().is_empty() {
            sections.push(section);
        }
    }
    sections.join("\n\n")
}

fn push_list(list: &List, indent: &str, lines: &mut Vec<String>) {
    for (index, item) in list.items.iter().enumerate() {
        let marker = match list.kind {
            ListKind::Bullet => "- ".to_string(),
            ListKind::Ordered => format!("{}. ", index + 1),
        };
        let nested = format!("{indent}{}", " ".repeat(marker.len()));
        lines.push(format!("{indent}{marker}{}", format_inlines(&item.inlines, &nested)));
        if let Some(sublist) = &item.sublist {
            push_list(sublist, &nested, lines);
        }
    }
}

fn format_code_block(code: &str) -> String {
    // The fence must be longer than any backtick run inside the code.
    let longest = code
        .split(|ch: char| ch != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence}\n{code}\n{fence}")
}

fn format_table(table: &Table) -> String {
    let Some(columns) = table.rows.iter().map(Vec::len).max().filter(|&n| n > 0) else {
        return String::new();
    };
    let mut lines = Vec::new();
    for (index, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = (0..columns)
            .map(|column| {
                row.get(column)
                    .map(|cell| format_inlines(&cell.inlines, "").replace('|', "\\|"))
                    .unwrap_or_default()
            })
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if index == 0 {
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    lines.join("\n")
}

/// Formats runs, grouping consecutive runs that share a link target.
///
/// Line breaks become backslash hard breaks continued at `indent`.
fn format_inlines(runs: &[TextRun], indent: &str) -> String {
    let mut out = String::new();
    let mut index = 0;
    while index < runs.len() {
        let link = runs[index].style.link.as_deref();
        let mut end = index + 1;
        while end < runs.len() && runs[end].style.link.as_deref() == link {
            end += 1;
        }
        let inner: String = runs[index..end]
            .iter()
            .map(|run| format_run(run, indent))
            .collect();
        match link {
            Some(url) => out.push_str(&format!("[{inner}]({})", escape_url(url))),
            None => out.push_str(&inner),
        }
        index = end;
    }
    out
}

fn format_run(run: &TextRun, indent: &str) -> String {
    let text = escape_text(&run.text).replace('\n', &format!("\\\n{indent}"));
    let style = &run.style;
    if !(style.bold || style.italic || style.strikethrough || style.underline) {
        return text;
    }
    // Delimiters may not touch whitespace, so edge whitespace stays outside.
    let core = text.trim();
    if core.is_empty() {
        return text;
    }
    let start = text.len() - text.trim_start().len();
    let (leading, trailing) = (&text[..start], &text[start + core.len()..]);

    let mut marked = core.to_string();
    if style.underline {
        marked = format!("<u>{marked}</u>");
    }
    if style.strikethrough {
        marked = format_strikethrough(&marked);
    }
    if style.italic {
        marked = format_italic(&marked);
    }
    if style.bold {
        marked = format_bold(&marked);
    }
    format!("{leading}{marked}{trailing}")
}

fn format_bold(text: &str) -> String {
    format!("**{text}**")
}

fn format_italic(text: &str) -> String {
    format!("*{text}*")
}

fn format_strikethrough(text: &str) -> String {
    format!("~~{text}~~")
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '`' | '[' | ']' | '~' | '<' | '#') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn escape_url(url: &str) -> String {
    url.replace(' ', "%20").replace('(', "%28").replace(')', "%29")
}
