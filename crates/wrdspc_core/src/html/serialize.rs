use crate::model::document::{Block, Document, List, ListKind};
use crate::model::inline::{runs_text, TextRun};

/// Serializes a document to an HTML fragment.
pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    for block in &doc.blocks {
        write_block(&mut out, block);
    }
    out
}

/// Plain-text view: one line per text container, table cells tab-separated.
pub fn to_plain_text(doc: &Document) -> String {
    let mut lines = Vec::new();
    for block in &doc.blocks {
        match block {
            Block::Paragraph(inlines) | Block::Heading { inlines, .. } | Block::CodeBlock(inlines) => {
                lines.push(runs_text(inlines));
            }
            Block::List(list) => push_list_lines(list, &mut lines),
            Block::Table(table) => {
                for row in &table.rows {
                    let cells: Vec<String> =
                        row.iter().map(|cell| runs_text(&cell.inlines)).collect();
                    lines.push(cells.join("\t"));
                }
            }
            Block::Image { .. } => {}
        }
    }
    lines.join("\n")
}

fn push_list_lines(list: &List, lines: &mut Vec<String>) {
    for item in &list.items {
        lines.push(runs_text(&item.inlines));
        if let Some(sublist) = &item.sublist {
            push_list_lines(sublist, lines);
        }
    }
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph(inlines) => {
            out.push_str("<p>");
            write_inlines(out, inlines, false);
            out.push_str("</p>");
        }
        Block::CodeBlock(inlines) => {
            out.push_str("<pre><code>");
            write_inlines(out, inlines, true);
            out.push_str("</code></pre>");
        }
        Block::Heading { level, inlines } => {
            let level = level.get();
            out.push_str(&format!("<h{level}>"));
            write_inlines(out, inlines, false);
            out.push_str(&format!("</h{level}>"));
        }
        Block::List(list) => write_list(out, list),
        Block::Table(table) => {
            out.push_str("<table><tbody>");
            for row in &table.rows {
                out.push_str("<tr>");
                for cell in row {
                    out.push_str("<td>");
                    write_inlines(out, &cell.inlines, false);
                    out.push_str("</td>");
                }
                out.push_str("</tr>");
            }
            out.push_str("</tbody></table>");
        }
        Block::Image { src, alt } => {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\">",
                escape_attr(src),
                escape_attr(alt)
            ));
        }
    }
}

fn write_list(out: &mut String, list: &List) {
    let tag = match list.kind {
        ListKind::Bullet => "ul",
        ListKind::Ordered => "ol",
    };
    out.push_str(&format!("<{tag}>"));
    for item in &list.items {
        out.push_str("<li>");
        write_inlines(out, &item.inlines, false);
        if let Some(sublist) = &item.sublist {
            write_list(out, sublist);
        }
        out.push_str("</li>");
    }
    out.push_str(&format!("</{tag}>"));
}

// Nesting order, outermost first: a, strong, em, u, s, span.
fn write_inlines(out: &mut String, runs: &[TextRun], preformatted: bool) {
    for run in runs {
        let style = &run.style;
        let mut closers: Vec<&str> = Vec::new();
        if let Some(href) = &style.link {
            out.push_str(&format!("<a href=\"{}\">", escape_attr(href)));
            closers.push("</a>");
        }
        if style.bold {
            out.push_str("<strong>");
            closers.push("</strong>");
        }
        if style.italic {
            out.push_str("<em>");
            closers.push("</em>");
        }
        if style.underline {
            out.push_str("<u>");
            closers.push("</u>");
        }
        if style.strikethrough {
            out.push_str("<s>");
            closers.push("</s>");
        }
        if let Some(color) = &style.color {
            out.push_str(&format!("<span style=\"color: {}\">", escape_attr(color)));
            closers.push("</span>");
        }
        write_text(out, &run.text, preformatted);
        for closer in closers.iter().rev() {
            out.push_str(closer);
        }
    }
}

// Outside <pre> the parser collapses whitespace runs, so every whitespace
// char that would join a run is written as a character reference.
fn write_text(out: &mut String, text: &str, preformatted: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ if preformatted => out.push(ch),
            '\n' => out.push_str("<br>"),
            ' ' if out.ends_with(is_html_space) => out.push_str("&#32;"),
            '\t' | '\r' | '\u{c}' => out.push_str(&format!("&#{};", u32::from(ch))),
            other => out.push(other),
        }
    }
}

fn is_html_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{c}')
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::{HeadingLevel, ListItem, Table};
    use crate::model::inline::InlineStyle;

    #[test]
    fn inline_marks_nest_in_fixed_order() {
        let doc = Document::from_blocks(vec![Block::Paragraph(vec![
            TextRun::plain("a "),
            TextRun::styled(
                "b",
                InlineStyle {
                    bold: true,
                    italic: true,
                    link: Some("https://x.test/?a=1&b=2".to_string()),
                    ..InlineStyle::default()
                },
            ),
        ])]);
        assert_eq!(
            to_html(&doc),
            "<p>a <a href=\"https://x.test/?a=1&amp;b=2\"><strong><em>b</em></strong></a></p>"
        );
    }

    #[test]
    fn blocks_serialize_to_expected_tags() {
        let doc = Document::from_blocks(vec![
            Block::Heading {
                level: HeadingLevel::new(2).unwrap(),
                inlines: vec![TextRun::plain("T<1>")],
            },
            Block::List(List {
                kind: ListKind::Ordered,
                items: vec![ListItem::new(vec![TextRun::plain("x")])],
            }),
            Block::Table(Table::empty(1, 1)),
            Block::Image {
                src: "a\".png".to_string(),
                alt: String::new(),
            },
        ]);
        assert_eq!(
            to_html(&doc),
            "<h2>T&lt;1&gt;</h2><ol><li>x</li></ol>\
             <table><tbody><tr><td></td></tr></tbody></table>\
             <img src=\"a&quot;.png\" alt=\"\">"
        );
    }

    #[test]
    fn repeated_spaces_are_escaped_outside_code() {
        let doc = Document::from_blocks(vec![
            Block::paragraph("a  b\tc"),
            Block::CodeBlock(vec![TextRun::plain("if a < b {\n    go();\n}")]),
        ]);
        assert_eq!(
            to_html(&doc),
            "<p>a &#32;b&#9;c</p><pre><code>if a &lt; b {\n    go();\n}</code></pre>"
        );
    }

    #[test]
    fn plain_text_joins_containers_by_line() {
        let mut table = Table::empty(1, 2);
        table.rows[0][0].inlines = vec![TextRun::plain("c1")];
        table.rows[0][1].inlines = vec![TextRun::plain("c2")];
        let doc = Document::from_blocks(vec![Block::paragraph("p"), Block::Table(table)]);
        assert_eq!(to_plain_text(&doc), "p\nc1\tc2");
    }
}
