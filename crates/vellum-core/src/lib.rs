//! Core types and trait definitions for the Vellum document engine.
//!
//! No HTTP, database or runtime dependencies. This crate holds the data
//! model, the status state machine, the cancellation consent protocol and the
//! traits that storage backends and external collaborators implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod consent;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod store;
pub mod template;
pub mod version;

pub use error::{Error, Result};
