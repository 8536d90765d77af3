//! `GET /events`: change notifications as server-sent events.
//!
//! Each event is named `document_changed` and carries a
//! [`DocumentChanged`] as JSON data. Subscribers that fall behind skip the
//! events they missed and should re-fetch the documents they display.

use std::{convert::Infallible, time::Duration};

use axum::{
  extract::{Query, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use uuid::Uuid;
use vellum_core::{
  notify::{ChangeNotifier, DocumentChanged},
  store::DocumentStore,
  template::TemplateSource,
};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
  /// Only forward changes to this subject's documents.
  pub subject_id: Option<Uuid>,
}

/// `GET /events[?subject_id=<id>]`
pub async fn stream<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let rx = state.events.subscribe();
  let filter = params.subject_id;

  let stream = stream::unfold(rx, move |mut rx| async move {
    loop {
      match rx.recv().await {
        Ok(change) if filter.is_none_or(|s| s == change.subject_id) => {
          return Some((Ok(to_event(&change)), rx));
        }
        Ok(_) => {}
        Err(RecvError::Lagged(missed)) => {
          warn!(missed, "event subscriber lagged");
        }
        Err(RecvError::Closed) => return None,
      }
    }
  });

  Sse::new(stream).keep_alive(
    KeepAlive::new()
      .interval(Duration::from_secs(15))
      .text("ping"),
  )
}

fn to_event(change: &DocumentChanged) -> Event {
  let id = format!("{}:{}", change.document_id, change.version);
  Event::default()
    .event("document_changed")
    .id(id.clone())
    .json_data(change)
    .unwrap_or_else(|_| Event::default().id(id).comment("unserializable change"))
}
