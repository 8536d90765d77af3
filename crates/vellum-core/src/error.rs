//! Error types for `vellum-core`.
//!
//! Every engine operation reports failure through [`Error`]. Storage
//! backends convert their own errors into it so that domain failures raised
//! deep in a transaction reach the caller unchanged.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  document::{DocumentStatus, Party},
  lifecycle::Operation,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error(
    "cannot {operation} as {party}: document status is {}",
    .status.map_or("absent", DocumentStatus::as_str)
  )]
  InvalidTransition {
    /// `None` when no document exists yet (generation).
    status:    Option<DocumentStatus>,
    operation: Operation,
    party:     Party,
  },

  #[error("cancellation already requested by {by}")]
  AlreadyRequested { by: Party },

  #[error("{party} cannot settle its own cancellation request")]
  SelfConfirmationForbidden { party: Party },

  #[error(
    "document {document_id} changed concurrently: expected version \
     {expected}, found {found}"
  )]
  ConcurrentVersionConflict {
    document_id: Uuid,
    expected:    u32,
    found:       u32,
  },

  /// The persisted status moved while the version stayed put. The engine
  /// re-validates the operation against `found` before reporting.
  #[error(
    "document {document_id} changed concurrently: expected status \
     {expected}, found {found}"
  )]
  StatusChanged {
    document_id: Uuid,
    expected:    DocumentStatus,
    found:       DocumentStatus,
  },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("version {version} of document {document_id} not found")]
  VersionNotFound { document_id: Uuid, version: u32 },

  #[error("subject {0} has no active document")]
  NoActiveDocument(Uuid),

  #[error("template not found: {0:?}")]
  TemplateNotFound(String),

  #[error("subject {subject_id} already has active document {document_id}")]
  ActiveDocumentExists { subject_id: Uuid, document_id: Uuid },

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Only optimistic-concurrency failures are worth retrying after a re-read.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::ConcurrentVersionConflict { .. })
  }

  /// Stable machine-readable name for the error class.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidTransition { .. } => "invalid_transition",
      Self::AlreadyRequested { .. } => "already_requested",
      Self::SelfConfirmationForbidden { .. } => "self_confirmation_forbidden",
      Self::ConcurrentVersionConflict { .. } => "concurrent_version_conflict",
      Self::StatusChanged { .. } => "status_changed",
      Self::Validation(_) => "validation_error",
      Self::DocumentNotFound(_)
      | Self::VersionNotFound { .. }
      | Self::NoActiveDocument(_)
      | Self::TemplateNotFound(_) => "not_found",
      Self::ActiveDocumentExists { .. } => "active_document_exists",
      Self::Storage(_) => "storage_error",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
