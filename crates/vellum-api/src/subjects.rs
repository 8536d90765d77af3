//! Handlers for `/subjects/:subject_id` read models.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects/:subject_id/document` | The active document; 404 if none |
//! | `GET`  | `/subjects/:subject_id/documents` | Every document, cancelled included |

use axum::{
  Json,
  extract::{Path, State},
};
use uuid::Uuid;
use vellum_core::{
  document::Document, notify::ChangeNotifier, store::DocumentStore,
  template::TemplateSource,
};

use crate::{AppState, error::ApiError};

/// `GET /subjects/:subject_id/document`
pub async fn active<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Document>, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let document = state.engine.get_active_document(subject_id).await?;
  Ok(Json(document))
}

/// `GET /subjects/:subject_id/documents`
pub async fn list_all<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let documents = state.engine.list_all_documents(subject_id).await?;
  Ok(Json(documents))
}
