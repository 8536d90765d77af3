//! Handlers for `/documents/:id/versions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/documents/:id/versions` | Newest first; optional `limit`, `before` |
//! | `GET`  | `/documents/:id/versions/:n` | 404 if the version does not exist |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;
use vellum_core::{
  notify::ChangeNotifier,
  store::DocumentStore,
  template::TemplateSource,
  version::{Page, Version},
};

use crate::{AppState, error::ApiError};

const MAX_LIMIT: usize = 500;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Page size, capped at 500. Defaults to 50.
  pub limit:  Option<usize>,
  /// Only versions numbered strictly below this one. Pass the last
  /// `version_number` of the previous page to continue.
  pub before: Option<u32>,
}

/// `GET /documents/:id/versions[?limit=<n>][&before=<n>]`
pub async fn list<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Version>>, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let page = Page {
    limit:  params.limit.unwrap_or(Page::DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    before: params.before,
  };
  let versions = state.engine.list_versions(id, page).await?;
  Ok(Json(versions))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /documents/:id/versions/:n`
pub async fn get_one<S, T, N>(
  State(state): State<AppState<S, T, N>>,
  Path((id, number)): Path<(Uuid, u32)>,
) -> Result<Json<Version>, ApiError>
where
  S: DocumentStore + 'static,
  T: TemplateSource,
  N: ChangeNotifier,
{
  let version = state.engine.get_version(id, number).await?;
  Ok(Json(version))
}
