//! Acting-party extraction from request headers.

use axum::{extract::FromRequestParts, http::request::Parts};
use vellum_core::document::{Actor, Party};

use crate::error::ApiError;

pub const ACTOR_ID: &str = "x-actor-id";
pub const ACTOR_PARTY: &str = "x-actor-party";

/// The caller, read from `X-Actor-Id` and `X-Actor-Party`.
///
/// Rejects with 400 when either header is missing, empty, or the party is not
/// `owner` or `counterparty`.
#[derive(Debug, Clone)]
pub struct ActorHeaders(pub Actor);

impl<S> FromRequestParts<S> for ActorHeaders
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let header = |name: &str| {
      parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {name} header")))
    };

    let id = header(ACTOR_ID)?;
    let party: Party = header(ACTOR_PARTY)?
      .parse()
      .map_err(|_| ApiError::BadRequest(format!("invalid {ACTOR_PARTY} header")))?;

    Ok(Self(Actor { id: id.to_owned(), party }))
  }
}
