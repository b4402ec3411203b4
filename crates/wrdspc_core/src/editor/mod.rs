//! Rich-text editing core.
//!
//! # Responsibility
//! - Track the live selection and resolve the formats active at it.
//! - Apply formatting commands to an owned `Document`.
//!
//! # Invariants
//! - Nothing in this module touches storage; callers persist the
//!   serialization returned by `dispatch`.
//!
//! # See also
//! - `service::notebook` for the session that wires dispatch to saving.

pub mod ancestors;
pub mod command;
pub mod dispatcher;
pub(crate) mod outline;
pub mod resolver;
pub mod tracker;

pub use ancestors::{AncestorTag, TagName};
pub use command::{suggest, CatalogEntry, FormatCommand, CATALOG};
pub use dispatcher::{dispatch, DispatchError, DispatchOutcome, DispatchStatus};
pub use resolver::{resolve_active_formats, ActiveFormats, FormatId};
pub use tracker::{ancestor_chain, Rect, SelectionTracker, TrackedRange};
