//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Engine(#[from] vellum_core::Error),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("precondition failed: document has changed")]
  PreconditionFailed,
}

impl ApiError {
  fn status(&self) -> StatusCode {
    use vellum_core::Error as E;
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
      Self::Engine(e) => match e {
        E::DocumentNotFound(_)
        | E::VersionNotFound { .. }
        | E::NoActiveDocument(_)
        | E::TemplateNotFound(_) => StatusCode::NOT_FOUND,
        E::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        E::InvalidTransition { .. }
        | E::AlreadyRequested { .. }
        | E::SelfConfirmationForbidden { .. }
        | E::ActiveDocumentExists { .. } => StatusCode::CONFLICT,
        // A status move only surfaces when the caller's precondition named
        // the old status.
        E::ConcurrentVersionConflict { .. } | E::StatusChanged { .. } => {
          StatusCode::PRECONDITION_FAILED
        }
        E::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      Self::Engine(e) => e.kind(),
      Self::BadRequest(_) => "bad_request",
      Self::PreconditionFailed => "precondition_failed",
    }
  }

  fn retryable(&self) -> bool {
    match self {
      Self::Engine(e) => e.is_retryable(),
      Self::PreconditionFailed => true,
      Self::BadRequest(_) => false,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    let body = json!({
      "error":     self.to_string(),
      "kind":      self.kind(),
      "retryable": self.retryable(),
    });
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;
  use vellum_core::{
    Error,
    document::{DocumentStatus, Party},
  };

  use super::*;

  #[test]
  fn conflicts_map_to_http_statuses() {
    let id = Uuid::nil();
    let cases = [
      (Error::DocumentNotFound(id), StatusCode::NOT_FOUND),
      (Error::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
      (Error::AlreadyRequested { by: Party::Owner }, StatusCode::CONFLICT),
      (
        Error::ConcurrentVersionConflict { document_id: id, expected: 1, found: 2 },
        StatusCode::PRECONDITION_FAILED,
      ),
      (
        Error::StatusChanged {
          document_id: id,
          expected:    DocumentStatus::Published,
          found:       DocumentStatus::Signed,
        },
        StatusCode::PRECONDITION_FAILED,
      ),
      (Error::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
      assert_eq!(ApiError::from(err).status(), expected);
    }
  }

  #[test]
  fn only_version_conflicts_are_retryable() {
    let conflict = ApiError::from(Error::ConcurrentVersionConflict {
      document_id: Uuid::nil(),
      expected:    1,
      found:       2,
    });
    assert!(conflict.retryable());
    assert!(!ApiError::from(Error::Validation("x".into())).retryable());
  }
}
