//! Domain model for pages and their rich-text content.
//!
//! # Responsibility
//! - Define plain data structures shared by editor, repository and service
//!   layers.
//! - Keep validation rules next to the data they protect.
//!
//! # Invariants
//! - A `Document` is exclusively owned by its `Page` (as serialized content).
//! - `Selection` values are transient references and are never persisted.

pub mod document;
pub mod inline;
pub mod page;
pub mod preferences;
pub mod selection;
