//! The `DocumentStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `vellum-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  document::{Document, NewDocument, Revision},
  version::{NewVersion, Page, Version},
};

/// Abstraction over the transactional persistence substrate.
///
/// Each write is one atomic unit: the document row and its newest version are
/// written together or not at all. Writes carry the [`Revision`] they were
/// planned against and must fail with
/// [`Error::ConcurrentVersionConflict`](crate::Error::ConcurrentVersionConflict)
/// when the persisted version has moved, or
/// [`Error::StatusChanged`](crate::Error::StatusChanged) when only the status
/// has. There is no locking beyond that check.
///
/// Version rows are never updated.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Create a `Draft` document together with its version 1.
  ///
  /// Fails with [`Error::ActiveDocumentExists`](crate::Error::ActiveDocumentExists)
  /// if the subject already has a document that is not cancelled.
  fn create_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<(Document, Version), Self::Error>> + Send + '_;

  /// Retrieve a document by id. Returns `None` if not found.
  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// The subject's single non-cancelled document, if any.
  fn active_document(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Every document for a subject, active and cancelled, oldest first.
  fn list_documents(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Persist the status and cancellation fields of `next`. Content and
  /// version are left untouched.
  fn update_document(
    &self,
    expected: Revision,
    next: Document,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Remove a document and its versions.
  fn delete_document(
    &self,
    expected: Revision,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Versions ──────────────────────────────────────────────────────────

  /// Write version `expected.version + 1` and make it the document's current
  /// content, leaving status unchanged.
  fn append_version(
    &self,
    expected: Revision,
    input: NewVersion,
  ) -> impl Future<Output = Result<(Document, Version), Self::Error>> + Send + '_;

  /// Versions of a document, newest first.
  fn list_versions(
    &self,
    document_id: Uuid,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + '_;

  /// A single version. Returns `None` if out of range.
  fn get_version(
    &self,
    document_id: Uuid,
    version_number: u32,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + '_;
}
