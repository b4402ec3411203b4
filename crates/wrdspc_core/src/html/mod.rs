//! HTML fragment codec for page content.
//!
//! # Responsibility
//! - Serialize a `Document` to the HTML fragment stored in page records.
//! - Parse fragments written by this crate and by the legacy browser editor.
//! - Export documents as plain text and markdown.
//!
//! # Invariants
//! - `parse_html(&to_html(doc)) == doc.normalized()` for every document.
//! - Unknown elements are transparent: their content is kept, the tag is not.

mod markdown;
mod parse;
mod serialize;

pub use markdown::to_markdown;
pub use parse::{parse_html, HtmlParseError, HtmlParseErrorKind};
pub use serialize::{to_html, to_plain_text};
