//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repositories, the editor core and the persistence gateway
//!   into use-case level APIs.
//! - Keep host/UI layers decoupled from storage details.

pub mod app_context;
pub mod clock;
pub mod notebook;
pub mod page_service;
pub mod persistence;

pub use app_context::{AppContext, ContextChange, SubscriptionId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use notebook::{EditorSession, Notebook, NotebookError, NotebookResult};
pub use page_service::PageService;
pub use persistence::{
    CommitResult, PersistenceError, PersistenceGateway, SaveAck, DEFAULT_QUIET_PERIOD_MS,
};
