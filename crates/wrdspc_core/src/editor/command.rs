//! Formatting commands and the catalog every toolbar or menu renders.
//!
//! Floating toolbars, slash menus and minimal toolbars are presentations of
//! the same `CATALOG`; they all map a selected id to a `FormatCommand` and
//! hand it to the dispatcher.

use crate::model::document::HeadingLevel;

const DEFAULT_TABLE_ROWS: usize = 3;
const DEFAULT_TABLE_COLS: usize = 3;
const MAX_TABLE_DIMENSION: usize = 20;
const SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    BulletList,
    OrderedList,
    Heading(HeadingLevel),
    /// Resets touched blocks to plain paragraphs.
    Paragraph,
    /// Turns touched lines into preformatted code; reverts when already code.
    CodeBlock,
    /// Inserts an unchecked box marker at the caret.
    Checkbox,
    Link {
        url: String,
    },
    Unlink,
    Image {
        src: String,
        alt: String,
    },
    Table {
        rows: usize,
        cols: usize,
    },
    InsertDate,
    InsertTime,
    Indent,
    Outdent,
    /// Sets (`Some`) or clears (`None`) the text color.
    Color(Option<String>),
}

impl FormatCommand {
    /// Maps a catalog id and optional payload to a command.
    ///
    /// Payloads: URL for `link`/`image`, `"<rows>x<cols>"` for `table`, CSS
    /// color for `color`. Returns `None` for unknown ids.
    pub fn parse(id: &str, payload: Option<&str>) -> Option<Self> {
        let payload = payload.map(str::trim).unwrap_or("");
        let command = match id.trim().to_ascii_lowercase().as_str() {
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "underline" => Self::Underline,
            "strike" | "strikethrough" => Self::Strikethrough,
            "bullet" => Self::BulletList,
            "ordered" => Self::OrderedList,
            "normal" | "paragraph" => Self::Paragraph,
            "code" => Self::CodeBlock,
            "checkbox" => Self::Checkbox,
            "link" => Self::Link {
                url: payload.to_string(),
            },
            "unlink" => Self::Unlink,
            "image" => Self::Image {
                src: payload.to_string(),
                alt: String::new(),
            },
            "table" => {
                let (rows, cols) = parse_table_size(payload);
                Self::Table { rows, cols }
            }
            "date" => Self::InsertDate,
            "time" => Self::InsertTime,
            "indent" => Self::Indent,
            "outdent" => Self::Outdent,
            "color" => Self::Color((!payload.is_empty()).then(|| payload.to_string())),
            other => {
                let level = other.strip_prefix('h')?.parse::<u8>().ok()?;
                Self::Heading(HeadingLevel::new(level)?)
            }
        };
        Some(command)
    }

    /// Inline toggles flip a character attribute on the selected text.
    pub fn is_inline_toggle(&self) -> bool {
        matches!(
            self,
            Self::Bold | Self::Italic | Self::Underline | Self::Strikethrough
        )
    }
}

fn parse_table_size(payload: &str) -> (usize, usize) {
    let parsed = payload.split_once(['x', 'X']).and_then(|(rows, cols)| {
        let rows = rows.trim().parse::<usize>().ok()?;
        let cols = cols.trim().parse::<usize>().ok()?;
        Some((rows, cols))
    });
    match parsed {
        Some((rows, cols)) if rows > 0 && cols > 0 => (
            rows.min(MAX_TABLE_DIMENSION),
            cols.min(MAX_TABLE_DIMENSION),
        ),
        _ => (DEFAULT_TABLE_ROWS, DEFAULT_TABLE_COLS),
    }
}

/// Catalog entry rendered by menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    /// Whether the command needs a payload (URL) before dispatch.
    pub needs_payload: bool,
}

const fn entry(id: &'static str, label: &'static str, description: &'static str) -> CatalogEntry {
    CatalogEntry {
        id,
        label,
        description,
        needs_payload: false,
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    entry("normal", "Normal Text", "Plain paragraph"),
    entry("h1", "Heading 1", "Large section heading"),
    entry("h2", "Heading 2", "Medium section heading"),
    entry("h3", "Heading 3", "Small section heading"),
    entry("h4", "Heading 4", "Subsection heading"),
    entry("h5", "Heading 5", "Minor heading"),
    entry("h6", "Heading 6", "Smallest heading"),
    entry("bold", "Bold", "Toggle bold text"),
    entry("italic", "Italic", "Toggle italic text"),
    entry("underline", "Underline", "Toggle underlined text"),
    entry("strike", "Strikethrough", "Toggle struck-through text"),
    entry("bullet", "Bullet List", "Create a bulleted list"),
    entry("ordered", "Numbered List", "Create a numbered list"),
    entry("code", "Code Block", "Preformatted code"),
    entry("checkbox", "Checkbox", "Insert a to-do box"),
    CatalogEntry {
        needs_payload: true,
        ..entry("link", "Link", "Link the selection to a URL")
    },
    CatalogEntry {
        needs_payload: true,
        ..entry("image", "Image", "Insert an image from a URL")
    },
    entry("table", "Table", "Insert a table"),
    entry("date", "Date", "Insert today's date"),
    entry("time", "Time", "Insert the current time"),
    entry("indent", "Indent", "Nest list items one level deeper"),
    entry("outdent", "Outdent", "Lift list items one level up"),
];

/// Slash-menu lookup: entries whose label starts with `query`.
///
/// Case-insensitive, at most five results, catalog order.
pub fn suggest(query: &str) -> Vec<&'static CatalogEntry> {
    let query = query.trim().to_lowercase();
    CATALOG
        .iter()
        .filter(|entry| entry.label.to_lowercase().starts_with(&query))
        .take(SUGGESTION_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_id_parses() {
        for entry in CATALOG {
            assert!(
                FormatCommand::parse(entry.id, Some("https://example.com")).is_some(),
                "catalog id `{}` should parse",
                entry.id
            );
        }
    }

    #[test]
    fn parse_heading_ids_and_rejects_unknown() {
        assert_eq!(
            FormatCommand::parse("H3", None),
            Some(FormatCommand::Heading(HeadingLevel::new(3).unwrap()))
        );
        assert_eq!(FormatCommand::parse("h9", None), None);
        assert_eq!(FormatCommand::parse("sparkle", None), None);
    }

    #[test]
    fn table_payload_defaults_and_clamps() {
        assert_eq!(
            FormatCommand::parse("table", None),
            Some(FormatCommand::Table { rows: 3, cols: 3 })
        );
        assert_eq!(
            FormatCommand::parse("table", Some("2x5")),
            Some(FormatCommand::Table { rows: 2, cols: 5 })
        );
        assert_eq!(
            FormatCommand::parse("table", Some("100x1")),
            Some(FormatCommand::Table { rows: 20, cols: 1 })
        );
    }

    #[test]
    fn suggest_matches_label_prefix_and_limits_results() {
        let headings: Vec<&str> = suggest("head").iter().map(|entry| entry.id).collect();
        assert_eq!(headings, vec!["h1", "h2", "h3", "h4", "h5"]);
        let bullets: Vec<&str> = suggest("BUL").iter().map(|entry| entry.id).collect();
        assert_eq!(bullets, vec!["bullet"]);
        assert!(suggest("zzz").is_empty());
        let c_entries: Vec<&str> = suggest("c").iter().map(|entry| entry.id).collect();
        assert_eq!(c_entries, vec!["code", "checkbox"]);
    }
}
