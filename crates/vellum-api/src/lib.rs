//! JSON REST API for Vellum.
//!
//! Exposes an axum [`Router`] over an [`Engine`] plus a server-sent-events
//! stream of change notifications. Auth, TLS, and transport concerns are the
//! caller's responsibility; the acting party is taken on trust from the
//! `X-Actor-Id` / `X-Actor-Party` headers.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vellum_api::api_router(engine, events))
//! ```

pub mod actor;
pub mod documents;
pub mod error;
pub mod etag;
pub mod events;
pub mod subjects;
pub mod versions;

#[cfg(test)]
mod tests;

use axum::{
  Router,
  routing::{get, post, put},
};
use vellum_core::{
  notify::ChangeNotifier, store::DocumentStore, template::TemplateSource,
};
use vellum_engine::{BroadcastNotifier, Engine};

pub use actor::ActorHeaders;
pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<S, T, N> {
  pub engine: Engine<S, T, N>,
  /// Source of the `/events` stream.
  pub events: BroadcastNotifier,
}

impl<S, T, N> Clone for AppState<S, T, N> {
  fn clone(&self) -> Self {
    Self {
      engine: self.engine.clone(),
      events: self.events.clone(),
    }
  }
}

/// Build a fully-materialised API router for `engine`.
///
/// `events` is usually the same [`BroadcastNotifier`] the engine announces
/// through. The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S, T, N>(
  engine: Engine<S, T, N>,
  events: BroadcastNotifier,
) -> Router<()>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  Router::new()
    // Documents
    .route("/documents", post(documents::generate::<S, T, N>))
    .route(
      "/documents/{id}",
      get(documents::get_one::<S, T, N>).delete(documents::delete_one::<S, T, N>),
    )
    .route("/documents/{id}/content", put(documents::edit::<S, T, N>))
    .route("/documents/{id}/regenerate", post(documents::regenerate::<S, T, N>))
    .route("/documents/{id}/publish", post(documents::publish::<S, T, N>))
    .route("/documents/{id}/sign", post(documents::sign::<S, T, N>))
    .route("/documents/{id}/render", post(documents::render::<S, T, N>))
    // Cancellation consent
    .route(
      "/documents/{id}/cancellation",
      post(documents::request_cancellation::<S, T, N>),
    )
    .route(
      "/documents/{id}/cancellation/confirm",
      post(documents::confirm_cancellation::<S, T, N>),
    )
    .route(
      "/documents/{id}/cancellation/reject",
      post(documents::reject_cancellation::<S, T, N>),
    )
    .route(
      "/documents/{id}/cancellation/withdraw",
      post(documents::withdraw_cancellation::<S, T, N>),
    )
    // Versions
    .route("/documents/{id}/versions", get(versions::list::<S, T, N>))
    .route("/documents/{id}/versions/{n}", get(versions::get_one::<S, T, N>))
    // Subjects
    .route("/subjects/{subject_id}/document", get(subjects::active::<S, T, N>))
    .route("/subjects/{subject_id}/documents", get(subjects::list_all::<S, T, N>))
    // Events
    .route("/events", get(events::stream::<S, T, N>))
    .with_state(AppState { engine, events })
}
