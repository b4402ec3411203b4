use crate::model::document::{Block, Document, HeadingLevel, List, ListItem, ListKind, Table, TableCell};
use crate::model::inline::{normalize_runs, runs_text, InlineStyle, TextRun};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::error::Error;
use std::fmt::{Display, Formatter};

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^<(/?)([A-Za-z][A-Za-z0-9]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .expect("valid tag regex")
});
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute regex")
});
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("valid entity regex")
});
static SPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\n\r\x0C]+").expect("valid whitespace regex"));
const CHECKBOX_UNCHECKED: &str = "\u{2610}";
const CHECKBOX_CHECKED: &str = "\u{2611}";

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];
const CONTAINER_TAGS: &[&str] = &[
    "article",
    "aside",
    "blockquote",
    "body",
    "div",
    "figure",
    "footer",
    "header",
    "html",
    "main",
    "nav",
    "section",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlParseErrorKind {
    UnterminatedComment,
    UnterminatedTag,
    MalformedTag,
}

/// Markup that cannot be tokenized; `offset` is a byte offset into the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlParseError {
    pub offset: usize,
    pub kind: HtmlParseErrorKind,
}

impl HtmlParseError {
    fn new(offset: usize, kind: HtmlParseErrorKind) -> Self {
        Self { offset, kind }
    }
}

impl Display for HtmlParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let what = match self.kind {
            HtmlParseErrorKind::UnterminatedComment => "unterminated comment",
            HtmlParseErrorKind::UnterminatedTag => "unterminated tag",
            HtmlParseErrorKind::MalformedTag => "malformed tag",
        };
        write!(f, "{what} at byte {}", self.offset)
    }
}

impl Error for HtmlParseError {}

/// Parses an HTML fragment into a normalized document.
///
/// Tolerates stray closing tags, unclosed elements and unknown tags; fails
/// only when a tag or comment cannot be tokenized. Whitespace runs in text
/// collapse to one space except inside `<pre>`.
pub fn parse_html(input: &str) -> Result<Document, HtmlParseError> {
    let tokens = tokenize(input)?;
    let nodes = build_tree(tokens);
    let mut blocks = Vec::new();
    convert_blocks(nodes, &mut blocks);
    let mut doc = Document::from_blocks(blocks);
    doc.normalize();
    Ok(doc)
}

#[derive(Debug)]
enum Token {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    /// Raw text; entities are decoded after whitespace handling.
    Text(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, HtmlParseError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while let Some(relative) = input[pos..].find('<') {
        let at = pos + relative;
        let rest = &input[at..];

        if rest.starts_with("<!--") {
            push_text(&mut tokens, &input[text_start..at]);
            let end = rest
                .find("-->")
                .ok_or(HtmlParseError::new(at, HtmlParseErrorKind::UnterminatedComment))?;
            pos = at + end + 3;
            text_start = pos;
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            push_text(&mut tokens, &input[text_start..at]);
            let end = rest
                .find('>')
                .ok_or(HtmlParseError::new(at, HtmlParseErrorKind::UnterminatedTag))?;
            pos = at + end + 1;
            text_start = pos;
            continue;
        }

        let mut lookahead = rest[1..].chars();
        let looks_like_tag = match lookahead.next() {
            Some(ch) if ch.is_ascii_alphabetic() => true,
            Some('/') => lookahead.next().is_some_and(|ch| ch.is_ascii_alphabetic()),
            _ => false,
        };
        if !looks_like_tag {
            pos = at + 1;
            continue;
        }

        let Some(caps) = TAG_RE.captures(rest) else {
            let kind = if rest.contains('>') {
                HtmlParseErrorKind::MalformedTag
            } else {
                HtmlParseErrorKind::UnterminatedTag
            };
            return Err(HtmlParseError::new(at, kind));
        };

        push_text(&mut tokens, &input[text_start..at]);
        let name = caps[2].to_ascii_lowercase();
        if caps[1].is_empty() {
            tokens.push(Token::Open {
                name,
                attrs: parse_attrs(caps.get(3).map_or("", |m| m.as_str())),
                self_closing: !caps[4].is_empty(),
            });
        } else {
            tokens.push(Token::Close(name));
        }
        pos = at + caps[0].len();
        text_start = pos;
    }

    push_text(&mut tokens, &input[text_start..]);
    Ok(tokens)
}

fn push_text(tokens: &mut Vec<Token>, raw: &str) {
    if !raw.is_empty() {
        tokens.push(Token::Text(raw.to_string()));
    }
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (caps[1].to_ascii_lowercase(), decode_entities(value))
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            decode_entity(&caps[1]).map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(decimal) = body.strip_prefix('#') {
        return decimal.parse::<u32>().ok().and_then(char::from_u32);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

#[derive(Debug)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

fn build_tree(tokens: Vec<Token>) -> Vec<Node> {
    let mut stack = vec![Element {
        name: String::new(),
        attrs: Vec::new(),
        children: Vec::new(),
    }];

    for token in tokens {
        match token {
            Token::Text(text) => push_child(&mut stack, Node::Text(text)),
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                let is_void = self_closing || VOID_TAGS.contains(&name.as_str());
                let element = Element {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                if is_void {
                    push_child(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Token::Close(name) => {
                // Stray closing tags are ignored.
                if let Some(depth) = stack.iter().rposition(|element| element.name == name) {
                    while stack.len() > depth.max(1) {
                        close_top(&mut stack);
                    }
                }
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop() {
        push_child(stack, Node::Element(element));
    }
}

fn heading_level(name: &str) -> Option<HeadingLevel> {
    let digit = name.strip_prefix('h')?;
    HeadingLevel::new(digit.parse().ok()?)
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "pre" | "li" | "ul" | "ol" | "table" | "img" | "hr"
    ) || heading_level(name).is_some()
        || CONTAINER_TAGS.contains(&name)
}

fn convert_blocks(nodes: Vec<Node>, blocks: &mut Vec<Block>) {
    let mut pending = Vec::new();
    let mut images = Vec::new();
    for node in nodes {
        match node {
            Node::Element(element) if is_block_tag(&element.name) => {
                flush_paragraph(&mut pending, &mut images, blocks);
                convert_block(element, blocks);
            }
            other => collect_inline(other, &InlineStyle::default(), false, &mut pending, &mut images),
        }
    }
    flush_paragraph(&mut pending, &mut images, blocks);
}

fn flush_paragraph(pending: &mut Vec<TextRun>, images: &mut Vec<Block>, blocks: &mut Vec<Block>) {
    if runs_text(pending).trim().is_empty() {
        pending.clear();
    } else {
        normalize_runs(pending);
        blocks.push(Block::Paragraph(std::mem::take(pending)));
    }
    blocks.append(images);
}

fn convert_block(element: Element, blocks: &mut Vec<Block>) {
    match element.name.as_str() {
        "p" | "li" => {
            let base = element_style(&element);
            let (inlines, images) = block_inlines(element.children, &base, false);
            blocks.push(Block::Paragraph(inlines));
            blocks.extend(images);
        }
        "pre" => {
            let base = element_style(&element);
            let mut children = element.children;
            // A newline right after <pre> is not content.
            if let Some(Node::Text(text)) = children.first_mut() {
                if let Some(rest) = text.strip_prefix("\r\n").or_else(|| text.strip_prefix('\n')) {
                    *text = rest.to_string();
                }
            }
            let (inlines, images) = block_inlines(children, &base, true);
            blocks.push(Block::CodeBlock(inlines));
            blocks.extend(images);
        }
        "ul" => blocks.push(Block::List(convert_list(element, ListKind::Bullet))),
        "ol" => blocks.push(Block::List(convert_list(element, ListKind::Ordered))),
        "table" => blocks.push(Block::Table(convert_table(element))),
        "img" => blocks.push(image_block(&element)),
        "hr" => {}
        name => match heading_level(name) {
            Some(level) => {
                let base = element_style(&element);
                let (inlines, images) = block_inlines(element.children, &base, false);
                blocks.push(Block::Heading { level, inlines });
                blocks.extend(images);
            }
            None => convert_blocks(element.children, blocks),
        },
    }
}

/// Inline style carried by a block element's own `style` attribute.
fn element_style(element: &Element) -> InlineStyle {
    let mut style = InlineStyle::default();
    if let Some(css) = element.attr("style") {
        apply_css(css, &mut style);
    }
    style
}

fn block_inlines(
    children: Vec<Node>,
    base: &InlineStyle,
    preformatted: bool,
) -> (Vec<TextRun>, Vec<Block>) {
    let mut runs = Vec::new();
    let mut images = Vec::new();
    for child in children {
        collect_inline(child, base, preformatted, &mut runs, &mut images);
    }
    normalize_runs(&mut runs);
    // A lone <br> is the browser's placeholder for an empty line.
    if !preformatted && runs_text(&runs) == "\n" {
        runs.clear();
    }
    (runs, images)
}

fn collect_inline(
    node: Node,
    style: &InlineStyle,
    preformatted: bool,
    out: &mut Vec<TextRun>,
    images: &mut Vec<Block>,
) {
    let element = match node {
        Node::Text(text) => {
            let text = if preformatted {
                decode_entities(&text)
            } else {
                decode_entities(&SPACE_RUN_RE.replace_all(&text, " "))
            };
            out.push(TextRun::styled(text, style.clone()));
            return;
        }
        Node::Element(element) => element,
    };

    let mut style = style.clone();
    let preformatted = preformatted || element.name == "pre";
    match element.name.as_str() {
        "br" => {
            out.push(TextRun::styled("\n", style));
            return;
        }
        "img" => {
            images.push(image_block(&element));
            return;
        }
        "input" => {
            if element.attr("type").is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox")) {
                let marker = if element.attr("checked").is_some() {
                    CHECKBOX_CHECKED
                } else {
                    CHECKBOX_UNCHECKED
                };
                out.push(TextRun::styled(marker, style));
            }
            return;
        }
        "b" | "strong" => style.bold = true,
        "i" | "em" => style.italic = true,
        "u" | "ins" => style.underline = true,
        "s" | "strike" | "del" => style.strikethrough = true,
        "a" => {
            if let Some(href) = element.attr("href") {
                style.link = Some(href.to_string());
            }
        }
        "font" => {
            if let Some(color) = element.attr("color") {
                style.color = Some(color.trim().to_string());
            }
        }
        _ => {}
    }
    if let Some(css) = element.attr("style") {
        apply_css(css, &mut style);
    }
    for child in element.children {
        collect_inline(child, &style, preformatted, out, images);
    }
}

fn apply_css(css: &str, style: &mut InlineStyle) {
    for declaration in css.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        let lower = value.to_ascii_lowercase();
        match property.as_str() {
            "font-weight" => {
                if lower == "bold" || lower == "bolder" || lower.parse::<u16>().is_ok_and(|w| w >= 600) {
                    style.bold = true;
                }
            }
            "font-style" if lower == "italic" || lower == "oblique" => style.italic = true,
            "text-decoration" | "text-decoration-line" => {
                if lower.contains("underline") {
                    style.underline = true;
                }
                if lower.contains("line-through") {
                    style.strikethrough = true;
                }
            }
            "color" if !value.is_empty() => style.color = Some(value.to_string()),
            _ => {}
        }
    }
}

fn image_block(element: &Element) -> Block {
    Block::Image {
        src: element.attr("src").unwrap_or_default().to_string(),
        alt: element.attr("alt").unwrap_or_default().to_string(),
    }
}

fn list_kind(name: &str) -> Option<ListKind> {
    match name {
        "ul" => Some(ListKind::Bullet),
        "ol" => Some(ListKind::Ordered),
        _ => None,
    }
}

fn convert_list(element: Element, kind: ListKind) -> List {
    let mut items: Vec<ListItem> = Vec::new();
    for child in element.children {
        match child {
            Node::Element(item) if item.name == "li" => items.push(convert_item(item)),
            // Browsers nest lists directly inside lists when indenting.
            Node::Element(nested) if list_kind(&nested.name).is_some() => {
                let nested_kind = list_kind(&nested.name).unwrap_or(kind);
                let sublist = convert_list(nested, nested_kind);
                if items.is_empty() {
                    items.push(ListItem::default());
                }
                if let Some(last) = items.last_mut() {
                    attach_sublist(&mut last.sublist, sublist);
                }
            }
            Node::Text(text) if text.trim().is_empty() => {}
            other => {
                let mut runs = Vec::new();
                let mut images = Vec::new();
                collect_inline(other, &InlineStyle::default(), false, &mut runs, &mut images);
                normalize_runs(&mut runs);
                if !runs_text(&runs).trim().is_empty() {
                    items.push(ListItem::new(runs));
                }
            }
        }
    }
    List { kind, items }
}

fn convert_item(element: Element) -> ListItem {
    let mut runs = Vec::new();
    let mut images = Vec::new();
    let mut sublist = None;
    for child in element.children {
        match child {
            Node::Element(nested) if list_kind(&nested.name).is_some() => {
                let kind = list_kind(&nested.name).unwrap_or(ListKind::Bullet);
                attach_sublist(&mut sublist, convert_list(nested, kind));
            }
            other => collect_inline(other, &InlineStyle::default(), false, &mut runs, &mut images),
        }
    }
    normalize_runs(&mut runs);
    if runs_text(&runs) == "\n" {
        runs.clear();
    }
    ListItem {
        inlines: runs,
        sublist,
    }
}

fn attach_sublist(slot: &mut Option<List>, list: List) {
    match slot {
        Some(existing) => existing.items.extend(list.items),
        None => *slot = Some(list),
    }
}

fn convert_table(element: Element) -> Table {
    let mut rows = Vec::new();
    collect_rows(element.children, &mut rows);
    Table { rows }
}

fn collect_rows(nodes: Vec<Node>, rows: &mut Vec<Vec<TableCell>>) {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        match element.name.as_str() {
            "tr" => {
                let cells = element
                    .children
                    .into_iter()
                    .filter_map(|child| match child {
                        Node::Element(cell) if cell.name == "td" || cell.name == "th" => {
                            let base = element_style(&cell);
                            Some(TableCell {
                                inlines: block_inlines(cell.children, &base, false).0,
                            })
                        }
                        _ => None,
                    })
                    .collect();
                rows.push(cells);
            }
            "thead" | "tbody" | "tfoot" => collect_rows(element.children, rows),
            _ => {}
        }
    }
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
    fn parses_browser_markup_variants() {
        let doc = parse_html("<div>Hello <b>big</b>&nbsp;<span style=\"font-weight: 700\">world</span></div>")
            .unwrap();
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph(vec![
                TextRun::plain("Hello "),
                TextRun::styled("big", bold()),
                TextRun::plain("\u{a0}"),
                TextRun::styled("world", bold()),
            ])]
        );
    }

    #[test]
    fn top_level_text_becomes_paragraph() {
        let doc = parse_html("loose text<p>para</p>").unwrap();
        assert_eq!(
            doc.blocks,
            vec![Block::paragraph("loose text"), Block::paragraph("para")]
        );
    }

    #[test]
    fn lone_br_paragraph_is_empty() {
        let doc = parse_html("<p><br></p>").unwrap();
        assert_eq!(doc.blocks, vec![Block::Paragraph(Vec::new())]);
    }

    #[test]
    fn list_nested_directly_in_list_attaches_to_previous_item() {
        let doc = parse_html("<ul><li>a</li><ol><li>b</li></ol></ul>").unwrap();
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list");
        };
        let sublist = list.items[0].sublist.as_ref().expect("sublist");
        assert_eq!(sublist.kind, ListKind::Ordered);
        assert_eq!(sublist.items[0].inlines, vec![TextRun::plain("b")]);
    }

    #[test]
    fn stray_and_unclosed_tags_are_tolerated() {
        let doc = parse_html("</em><p>one<p>two").unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0], Block::paragraph("onetwo"));
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let doc = parse_html("<!DOCTYPE html><!-- note --><p>x</p>").unwrap();
        assert_eq!(doc.blocks, vec![Block::paragraph("x")]);
    }

    #[test]
    fn literal_less_than_is_text() {
        let doc = parse_html("<p>1 < 2</p>").unwrap();
        assert_eq!(doc.blocks, vec![Block::paragraph("1 < 2")]);
    }

    #[test]
    fn unterminated_tag_is_an_error() {
        let err = parse_html("<p>text<strong").unwrap_err();
        assert_eq!(err.kind, HtmlParseErrorKind::UnterminatedTag);
        assert_eq!(err.offset, 7);
        let err = parse_html("<!-- open").unwrap_err();
        assert_eq!(err.kind, HtmlParseErrorKind::UnterminatedComment);
    }

    #[test]
    fn images_inside_paragraph_are_hoisted_after_it() {
        let doc = parse_html("<p>see <img src=\"a.png\" alt=\"A\"> here</p>").unwrap();
        assert_eq!(
            doc.blocks,
            vec![
                Block::paragraph("see  here"),
                Block::Image {
                    src: "a.png".to_string(),
                    alt: "A".to_string(),
                },
            ]
        );
    }

    #[test]
    fn whitespace_runs_collapse_outside_pre() {
        let doc = parse_html("<p>alpha\n  beta</p>").unwrap();
        assert_eq!(doc.blocks, vec![Block::paragraph("alpha beta")]);

        let doc = parse_html("<p>tab\there&#32;&#32;kept</p>").unwrap();
        assert_eq!(doc.blocks, vec![Block::paragraph("tab here  kept")]);
    }

    #[test]
    fn pre_becomes_code_block_with_whitespace_intact() {
        let doc = parse_html("<pre>\nfn main() {\n    run();\n}</pre>").unwrap();
        assert_eq!(
            doc.blocks,
            vec![Block::CodeBlock(vec![TextRun::plain("fn main() {\n    run();\n}")])]
        );

        let doc = parse_html("<pre><code>a &lt; b</code></pre>").unwrap();
        assert_eq!(doc.blocks, vec![Block::CodeBlock(vec![TextRun::plain("a < b")])]);
    }

    #[test]
    fn checkbox_inputs_read_as_box_markers() {
        let doc = parse_html(
            "<p><input type=\"checkbox\"> milk</p><p><input type=\"checkbox\" checked> eggs</p>",
        )
        .unwrap();
        assert_eq!(
            doc.blocks,
            vec![Block::paragraph("\u{2610} milk"), Block::paragraph("\u{2611} eggs")]
        );
    }

    #[test]
    fn table_cells_read_through_sections() {
        let doc = parse_html("<table><thead><tr><th>h</th></tr></thead><tbody><tr><td>c</td></tr></tbody></table>")
            .unwrap();
        let Block::Table(table) = &doc.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0].inlines, vec![TextRun::plain("c")]);
    }
}
