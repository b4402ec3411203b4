//! Element tags describing where a caret sits.
//!
//! Chains are ordered nearest-first: the innermost inline element at the
//! anchor comes first and `TagName::Root` last. Hosts that track selection
//! in their own tree can build chains with `TagName::parse`.

use crate::model::document::HeadingLevel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagName {
    B,
    Strong,
    I,
    Em,
    U,
    S,
    Strike,
    Del,
    A,
    Span,
    Font,
    P,
    Div,
    Pre,
    Code,
    Heading(HeadingLevel),
    Ul,
    Ol,
    Li,
    Table,
    Tr,
    Td,
    Th,
    Root,
    Other(String),
}

impl TagName {
    /// Parses a DOM-style tag name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "b" => Self::B,
            "strong" => Self::Strong,
            "i" => Self::I,
            "em" => Self::Em,
            "u" => Self::U,
            "s" => Self::S,
            "strike" => Self::Strike,
            "del" => Self::Del,
            "a" => Self::A,
            "span" => Self::Span,
            "font" => Self::Font,
            "p" => Self::P,
            "div" => Self::Div,
            "pre" => Self::Pre,
            "code" => Self::Code,
            "ul" => Self::Ul,
            "ol" => Self::Ol,
            "li" => Self::Li,
            "table" => Self::Table,
            "tr" => Self::Tr,
            "td" => Self::Td,
            "th" => Self::Th,
            "body" | "root" => Self::Root,
            _ => heading_from_name(&lower).map_or(Self::Other(lower), Self::Heading),
        }
    }
}

fn heading_from_name(name: &str) -> Option<HeadingLevel> {
    let digit = name.strip_prefix('h')?;
    let level = digit.parse::<u8>().ok()?;
    HeadingLevel::new(level)
}

/// One enclosing element of the anchor, with its inline `style` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorTag {
    pub name: TagName,
    pub style: Option<String>,
}

impl AncestorTag {
    pub fn new(name: TagName) -> Self {
        Self { name, style: None }
    }

    pub fn with_style(name: TagName, style: impl Into<String>) -> Self {
        Self {
            name,
            style: Some(style.into()),
        }
    }

    /// Shorthand for `AncestorTag::new(TagName::parse(name))`.
    pub fn parse(name: &str) -> Self {
        Self::new(TagName::parse(name))
    }
}
