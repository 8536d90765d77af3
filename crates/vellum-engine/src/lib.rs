//! The Vellum document engine.
//!
//! [`Engine`] is the operation surface: generate, edit, publish, sign,
//! delete, the cancellation handshake, and the read-model queries. Each
//! operation loads the document, validates the move through
//! [`vellum_core::lifecycle`] / [`vellum_core::consent`], writes through a
//! [`DocumentStore`](vellum_core::store::DocumentStore) in a single guarded
//! transaction, and then announces the change on a detached task.

mod config;
mod engine;
mod history;
mod notify;
mod render;
mod templates;

pub use config::EngineConfig;
pub use engine::{DocumentEdit, Engine, Precondition};
pub use history::VersionHistory;
pub use notify::{BroadcastNotifier, NullNotifier};
pub use render::PlaceholderRenderer;
pub use templates::MemoryTemplates;
