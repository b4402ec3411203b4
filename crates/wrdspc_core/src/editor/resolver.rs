//! Active-format resolution.
//!
//! # Responsibility
//! - Turn an ancestor chain into the set of formats active at the caret.
//!
//! # Invariants
//! - Pure and infallible: unknown or irrelevant tags contribute nothing.
//! - List and heading axes are mutually exclusive; the nearest ancestor
//!   wins, so malformed nested chains still yield one value per axis.

use crate::editor::ancestors::{AncestorTag, TagName};
use crate::model::document::{HeadingLevel, ListKind};
use std::collections::BTreeSet;

/// Format identifier exposed to toolbars and toggle logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatId {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Link,
    BulletList,
    OrderedList,
    Heading(HeadingLevel),
    CodeBlock,
}

/// Formats active at one caret position, one field per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveFormats {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub link: bool,
    pub list: Option<ListKind>,
    pub heading: Option<HeadingLevel>,
    pub code_block: bool,
}

impl ActiveFormats {
    pub fn contains(&self, format: FormatId) -> bool {
        match format {
            FormatId::Bold => self.bold,
            FormatId::Italic => self.italic,
            FormatId::Underline => self.underline,
            FormatId::Strikethrough => self.strikethrough,
            FormatId::Link => self.link,
            FormatId::BulletList => self.list == Some(ListKind::Bullet),
            FormatId::OrderedList => self.list == Some(ListKind::Ordered),
            FormatId::Heading(level) => self.heading == Some(level),
            FormatId::CodeBlock => self.code_block,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_set(&self) -> BTreeSet<FormatId> {
        let mut set = BTreeSet::new();
        if self.bold {
            set.insert(FormatId::Bold);
        }
        if self.italic {
            set.insert(FormatId::Italic);
        }
        if self.underline {
            set.insert(FormatId::Underline);
        }
        if self.strikethrough {
            set.insert(FormatId::Strikethrough);
        }
        if self.link {
            set.insert(FormatId::Link);
        }
        match self.list {
            Some(ListKind::Bullet) => {
                set.insert(FormatId::BulletList);
            }
            Some(ListKind::Ordered) => {
                set.insert(FormatId::OrderedList);
            }
            None => {}
        }
        if let Some(level) = self.heading {
            set.insert(FormatId::Heading(level));
        }
        if self.code_block {
            set.insert(FormatId::CodeBlock);
        }
        set
    }
}

/// Computes active formats from a nearest-first ancestor chain.
pub fn resolve_active_formats(chain: &[AncestorTag]) -> ActiveFormats {
    let mut active = ActiveFormats::default();
    for tag in chain {
        match &tag.name {
            TagName::B | TagName::Strong => active.bold = true,
            TagName::I | TagName::Em => active.italic = true,
            TagName::U => active.underline = true,
            TagName::S | TagName::Strike | TagName::Del => active.strikethrough = true,
            TagName::A => active.link = true,
            TagName::Ul if active.list.is_none() => active.list = Some(ListKind::Bullet),
            TagName::Ol if active.list.is_none() => active.list = Some(ListKind::Ordered),
            TagName::Heading(level) if active.heading.is_none() => active.heading = Some(*level),
            TagName::Pre => active.code_block = true,
            _ => {}
        }
        if let Some(style) = tag.style.as_deref() {
            apply_inline_style(style, &mut active);
        }
    }
    active
}

fn apply_inline_style(style: &str, active: &mut ActiveFormats) {
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim().to_ascii_lowercase();
        match property.as_str() {
            "font-weight" if is_bold_weight(&value) => active.bold = true,
            "font-style" if value == "italic" || value == "oblique" => active.italic = true,
            "text-decoration" | "text-decoration-line" => {
                if value.contains("underline") {
                    active.underline = true;
                }
                if value.contains("line-through") {
                    active.strikethrough = true;
                }
            }
            _ => {}
        }
    }
}

fn is_bold_weight(value: &str) -> bool {
    match value {
        "bold" | "bolder" => true,
        numeric => numeric.parse::<u16>().is_ok_and(|weight| weight >= 600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> Vec<AncestorTag> {
        names.iter().map(|name| AncestorTag::parse(name)).collect()
    }

    #[test]
    fn empty_chain_yields_empty_set() {
        assert!(resolve_active_formats(&[]).is_empty());
        assert!(resolve_active_formats(&chain(&["p", "body"])).to_set().is_empty());
    }

    #[test]
    fn nearest_list_wins() {
        let active = resolve_active_formats(&chain(&["li", "ol", "li", "ul", "body"]));
        assert_eq!(active.list, Some(ListKind::Ordered));
        assert!(!active.contains(FormatId::BulletList));
    }

    #[test]
    fn inline_style_sets_bold_and_italic() {
        let tags = vec![
            AncestorTag::with_style(TagName::Span, "font-weight: 700; font-style: italic"),
            AncestorTag::parse("p"),
        ];
        let active = resolve_active_formats(&tags);
        assert!(active.bold);
        assert!(active.italic);
    }

    #[test]
    fn normal_weight_style_is_not_bold() {
        let tags = vec![AncestorTag::with_style(TagName::Span, "font-weight: 400")];
        assert!(!resolve_active_formats(&tags).bold);
    }

    #[test]
    fn text_decoration_style_sets_underline_and_strike() {
        let tags = vec![AncestorTag::with_style(
            TagName::Span,
            "text-decoration: underline line-through",
        )];
        let active = resolve_active_formats(&tags);
        assert!(active.underline);
        assert!(active.strikethrough);
    }

    #[test]
    fn pre_ancestor_marks_code_block() {
        let active = resolve_active_formats(&chain(&["code", "pre", "body"]));
        assert!(active.code_block);
        assert_eq!(active.to_set(), BTreeSet::from([FormatId::CodeBlock]));
    }
}
