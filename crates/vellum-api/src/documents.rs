//! Handlers for `/documents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/documents` | Body: [`GenerateBody`]; returns 201 + document |
//! | `GET`    | `/documents/:id` | Single document with `ETag` |
//! | `DELETE` | `/documents/:id` | Draft or published only; returns 204 |
//! | `PUT`    | `/documents/:id/content` | Body: [`EditBody`] |
//! | `POST`   | `/documents/:id/regenerate` | Re-fetch the template |
//! | `POST`   | `/documents/:id/publish` | |
//! | `POST`   | `/documents/:id/sign` | Counterparty only |
//! | `POST`   | `/documents/:id/cancellation` | Body: `{"reason":"..."}` |
//! | `POST`   | `/documents/:id/cancellation/confirm` | The other party |
//! | `POST`   | `/documents/:id/cancellation/reject` | The other party |
//! | `POST`   | `/documents/:id/cancellation/withdraw` | The requester |
//! | `POST`   | `/documents/:id/render` | Body: JSON data context |
//!
//! Every mutating endpoint honours `If-Match` against the document's ETag.

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vellum_core::{
  document::{Document, DocumentSource},
  notify::ChangeNotifier,
  store::DocumentStore,
  template::TemplateSource,
  version::ChangeType,
};
use vellum_engine::{DocumentEdit, Engine, Precondition};

use crate::{
  AppState,
  actor::ActorHeaders,
  error::ApiError,
  etag::{check_if_match, compute_etag, if_match},
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// A document response carrying its `ETag`.
fn tagged(status: StatusCode, document: Document) -> Response {
  let etag = compute_etag(&document);
  (status, [(header::ETAG, etag)], Json(document)).into_response()
}

/// Resolve `If-Match` into the revision the write must still find.
async fn precondition<S, T, N>(
  engine: &Engine<S, T, N>,
  document_id: Uuid,
  headers: &HeaderMap,
) -> Result<Option<Precondition>, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let Some(expected) = if_match(headers) else {
    return Ok(None);
  };
  let current = engine.get_document(document_id).await?;
  check_if_match(&current, expected)?;
  Ok(Some(current.revision().into()))
}

// ─── Generate ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /documents`.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
  pub subject_id: Uuid,
  /// `{"kind":"template","value":"<ref>"}` or `{"kind":"content","value":"..."}`.
  pub source:     DocumentSource,
}

/// `POST /documents`: returns 201 + the new draft.
pub async fn generate<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  ActorHeaders(actor): ActorHeaders,
  Json(body): Json<GenerateBody>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let document = state
    .engine
    .generate_document(body.subject_id, body.source, &actor)
    .await?;
  Ok(tagged(StatusCode::CREATED, document))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /documents/:id`
pub async fn get_one<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let document = state.engine.get_document(id).await?;
  Ok(tagged(StatusCode::OK, document))
}

/// `DELETE /documents/:id`: returns 204.
pub async fn delete_one<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  state.engine.delete_document(id, &actor, expected).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Content ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /documents/:id/content`.
#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub content:          String,
  #[serde(default)]
  pub change_type:      ChangeType,
  pub change_reason:    Option<String>,
  /// Alternative to `If-Match` for clients that track version numbers.
  pub expected_version: Option<u32>,
}

/// `PUT /documents/:id/content`
pub async fn edit<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
  Json(body): Json<EditBody>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let from_header = precondition(&state.engine, id, &headers).await?;
  let edit = DocumentEdit {
    content:          body.content,
    change_type:      body.change_type,
    change_reason:    body.change_reason,
    expected:         body.expected_version.map(Precondition::from).or(from_header),
  };
  let document = state.engine.edit_document(id, edit, &actor).await?;
  Ok(tagged(StatusCode::OK, document))
}

/// `POST /documents/:id/regenerate`
pub async fn regenerate<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  let document = state.engine.regenerate_document(id, &actor, expected).await?;
  Ok(tagged(StatusCode::OK, document))
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// `POST /documents/:id/publish`
pub async fn publish<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  let document = state.engine.publish_document(id, &actor, expected).await?;
  Ok(tagged(StatusCode::OK, document))
}

/// `POST /documents/:id/sign`
pub async fn sign<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  let document = state.engine.sign_document(id, &actor, expected).await?;
  Ok(tagged(StatusCode::OK, document))
}

// ─── Cancellation ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CancellationBody {
  pub reason: String,
}

/// `POST /documents/:id/cancellation`: body: `{"reason":"..."}`.
pub async fn request_cancellation<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
  Json(body): Json<CancellationBody>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  let document = state
    .engine
    .request_cancellation(id, &actor, &body.reason, expected)
    .await?;
  Ok(tagged(StatusCode::OK, document))
}

/// `POST /documents/:id/cancellation/confirm`
pub async fn confirm_cancellation<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  let document = state.engine.confirm_cancellation(id, &actor, expected).await?;
  Ok(tagged(StatusCode::OK, document))
}

/// `POST /documents/:id/cancellation/reject`
pub async fn reject_cancellation<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  let document = state.engine.reject_cancellation(id, &actor, expected).await?;
  Ok(tagged(StatusCode::OK, document))
}

/// `POST /documents/:id/cancellation/withdraw`
pub async fn withdraw_cancellation<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  ActorHeaders(actor): ActorHeaders,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let expected = precondition(&state.engine, id, &headers).await?;
  let document = state.engine.withdraw_cancellation(id, &actor, expected).await?;
  Ok(tagged(StatusCode::OK, document))
}

// ─── Render ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Rendered {
  pub document_id: Uuid,
  pub rendered:    String,
}

/// `POST /documents/:id/render`: body is the JSON data context.
pub async fn render<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  Json(context): Json<serde_json::Value>,
) -> Result<Json<Rendered>, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let rendered = state.engine.render_document(id, &context).await?;
  Ok(Json(Rendered { document_id: id, rendered }))
}
