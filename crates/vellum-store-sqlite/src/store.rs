//! [`SqliteStore`]: the SQLite implementation of [`DocumentStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use vellum_core::{
  document::{Document, DocumentStatus, NewDocument, Revision},
  store::DocumentStore,
  version::{NewVersion, Page, Version},
};

use crate::{
  Error, Result,
  encode::{
    DOCUMENT_COLUMNS, RawDocument, RawRevision, RawVersion, VERSION_COLUMNS,
    decode_uuid, diagnose, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// How long a writer waits on another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A Vellum document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Result of a write guarded by a revision check, carried out of the
/// connection thread so the domain error can be built on the async side.
enum Guarded<T> {
  Done(T),
  Rejected(Option<RawRevision>),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch at most one document matching `filter`, which binds `?1`.
  async fn query_document(
    &self,
    filter: &'static str,
    key: String,
  ) -> Result<Option<Document>> {
    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE {filter}"),
              rusqlite::params![key],
              RawDocument::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }
}

fn read_revision(
  conn: &rusqlite::Connection,
  document_id: &str,
) -> rusqlite::Result<Option<RawRevision>> {
  conn
    .query_row(
      "SELECT current_version, status FROM documents WHERE document_id = ?1",
      rusqlite::params![document_id],
      |row| {
        Ok(RawRevision {
          version: row.get(0)?,
          status:  row.get(1)?,
        })
      },
    )
    .optional()
}

fn read_active_id(
  conn: &rusqlite::Connection,
  subject_id: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT document_id FROM documents
       WHERE subject_id = ?1 AND status != 'cancelled'",
      rusqlite::params![subject_id],
      |r| r.get(0),
    )
    .optional()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
  )
}

fn read_document(
  conn: &rusqlite::Connection,
  document_id: &str,
) -> rusqlite::Result<RawDocument> {
  conn.query_row(
    &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE document_id = ?1"),
    rusqlite::params![document_id],
    RawDocument::from_row,
  )
}

fn rejected<T>(expected: &Revision, current: Option<RawRevision>) -> Result<T> {
  Err(Error::Core(diagnose(expected, current)?))
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn create_document(
    &self,
    input: NewDocument,
  ) -> Result<(Document, Version)> {
    let now = Utc::now();
    let document = Document {
      document_id:               Uuid::new_v4(),
      subject_id:                input.subject_id,
      status:                    DocumentStatus::Draft,
      current_version:           1,
      content:                   input.content,
      template_ref:              input.template_ref,
      signed_at:                 None,
      cancelled_at:              None,
      cancellation_reason:       None,
      cancellation_requested_by: None,
      created_by:                input.created_by,
      created_at:                now,
      updated_at:                now,
    };
    let version = Version {
      document_id:    document.document_id,
      version_number: 1,
      content:        document.content.clone(),
      status_at_time: DocumentStatus::Draft,
      change_type:    input.change_type,
      change_reason:  None,
      created_by:     document.created_by.clone(),
      created_at:     now,
    };

    let id_str       = encode_uuid(document.document_id);
    let subject_str  = encode_uuid(document.subject_id);
    let status_str   = DocumentStatus::Draft.as_str();
    let content      = document.content.clone();
    let template_ref = document.template_ref.clone();
    let created_by   = document.created_by.clone();
    let change_type  = version.change_type.as_str();
    let at_str       = encode_dt(now);

    let existing: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = read_active_id(&tx, &subject_str)?;
        if existing.is_some() {
          return Ok(existing);
        }

        let inserted = tx.execute(
          "INSERT INTO documents (
             document_id, subject_id, status, current_version, content,
             template_ref, created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            id_str,
            subject_str,
            status_str,
            content,
            template_ref,
            created_by,
            at_str,
          ],
        );
        // Another writer won the active-subject index.
        if let Err(err) = inserted {
          if is_constraint_violation(&err)
            && let Some(winner) = read_active_id(&tx, &subject_str)?
          {
            return Ok(Some(winner));
          }
          return Err(err.into());
        }

        tx.execute(
          "INSERT INTO versions (
             document_id, version_number, content, status_at_time,
             change_type, change_reason, created_by, created_at
           ) VALUES (?1, 1, ?2, ?3, ?4, NULL, ?5, ?6)",
          rusqlite::params![
            id_str,
            content,
            status_str,
            change_type,
            created_by,
            at_str,
          ],
        )?;

        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some(existing) = existing {
      return Err(Error::Core(vellum_core::Error::ActiveDocumentExists {
        subject_id:  document.subject_id,
        document_id: decode_uuid(&existing)?,
      }));
    }

    Ok((document, version))
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    self
      .query_document("document_id = ?1", encode_uuid(id))
      .await
  }

  async fn active_document(&self, subject_id: Uuid) -> Result<Option<Document>> {
    self
      .query_document(
        "subject_id = ?1 AND status != 'cancelled'",
        encode_uuid(subject_id),
      )
      .await
  }

  async fn list_documents(&self, subject_id: Uuid) -> Result<Vec<Document>> {
    let subject_str = encode_uuid(subject_id);

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLUMNS} FROM documents
           WHERE subject_id = ?1
           ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn update_document(
    &self,
    expected: Revision,
    next: Document,
  ) -> Result<Document> {
    let id_str          = encode_uuid(expected.document_id);
    let expected_status = expected.status.as_str();
    let expected_ver    = expected.version;
    let status_str      = next.status.as_str();
    let signed_at       = next.signed_at.map(encode_dt);
    let cancelled_at    = next.cancelled_at.map(encode_dt);
    let reason          = next.cancellation_reason;
    let requested_by    = next.cancellation_requested_by.map(|p| p.as_str());
    let updated_at      = encode_dt(next.updated_at);

    let outcome: Guarded<RawDocument> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
          "UPDATE documents SET
             status = ?1,
             signed_at = ?2,
             cancelled_at = ?3,
             cancellation_reason = ?4,
             cancellation_requested_by = ?5,
             updated_at = ?6
           WHERE document_id = ?7 AND current_version = ?8 AND status = ?9",
          rusqlite::params![
            status_str,
            signed_at,
            cancelled_at,
            reason,
            requested_by,
            updated_at,
            id_str,
            expected_ver,
            expected_status,
          ],
        )?;
        if changed == 0 {
          return Ok(Guarded::Rejected(read_revision(&tx, &id_str)?));
        }

        let raw = read_document(&tx, &id_str)?;
        tx.commit()?;
        Ok(Guarded::Done(raw))
      })
      .await?;

    match outcome {
      Guarded::Done(raw) => raw.into_document(),
      Guarded::Rejected(current) => rejected(&expected, current),
    }
  }

  async fn delete_document(&self, expected: Revision) -> Result<()> {
    let id_str           = encode_uuid(expected.document_id);
    let expected_status  = expected.status.as_str();
    let expected_version = expected.version;

    let outcome: Guarded<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
          "DELETE FROM documents
           WHERE document_id = ?1 AND current_version = ?2 AND status = ?3",
          rusqlite::params![id_str, expected_version, expected_status],
        )?;
        if changed == 0 {
          return Ok(Guarded::Rejected(read_revision(&tx, &id_str)?));
        }

        // Normally already gone through ON DELETE CASCADE.
        tx.execute(
          "DELETE FROM versions WHERE document_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(Guarded::Done(()))
      })
      .await?;

    match outcome {
      Guarded::Done(()) => Ok(()),
      Guarded::Rejected(current) => rejected(&expected, current),
    }
  }

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn append_version(
    &self,
    expected: Revision,
    input: NewVersion,
  ) -> Result<(Document, Version)> {
    let version = Version {
      document_id:    expected.document_id,
      version_number: expected.version + 1,
      content:        input.content,
      status_at_time: expected.status,
      change_type:    input.change_type,
      change_reason:  input.change_reason,
      created_by:     input.created_by,
      created_at:     Utc::now(),
    };

    let id_str           = encode_uuid(expected.document_id);
    let expected_status  = expected.status.as_str();
    let expected_version = expected.version;
    let number           = version.version_number;
    let content          = version.content.clone();
    let change_type      = version.change_type.as_str();
    let reason           = version.change_reason.clone();
    let created_by       = version.created_by.clone();
    let at_str           = encode_dt(version.created_at);

    let outcome: Guarded<RawDocument> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
          "UPDATE documents SET
             content = ?1,
             current_version = current_version + 1,
             updated_at = ?2
           WHERE document_id = ?3 AND current_version = ?4 AND status = ?5",
          rusqlite::params![
            content,
            at_str,
            id_str,
            expected_version,
            expected_status,
          ],
        )?;
        if changed == 0 {
          return Ok(Guarded::Rejected(read_revision(&tx, &id_str)?));
        }

        tx.execute(
          "INSERT INTO versions (
             document_id, version_number, content, status_at_time,
             change_type, change_reason, created_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            number,
            content,
            expected_status,
            change_type,
            reason,
            created_by,
            at_str,
          ],
        )?;

        let raw = read_document(&tx, &id_str)?;
        tx.commit()?;
        Ok(Guarded::Done(raw))
      })
      .await?;

    match outcome {
      Guarded::Done(raw) => Ok((raw.into_document()?, version)),
      Guarded::Rejected(current) => rejected(&expected, current),
    }
  }

  async fn list_versions(
    &self,
    document_id: Uuid,
    page: Page,
  ) -> Result<Vec<Version>> {
    let id_str = encode_uuid(document_id);
    let before = page.before;
    let limit  = page.limit as i64;

    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VERSION_COLUMNS} FROM versions
           WHERE document_id = ?1
             AND (?2 IS NULL OR version_number < ?2)
           ORDER BY version_number DESC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, before, limit],
            RawVersion::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }

  async fn get_version(
    &self,
    document_id: Uuid,
    version_number: u32,
  ) -> Result<Option<Version>> {
    let id_str = encode_uuid(document_id);

    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {VERSION_COLUMNS} FROM versions
                 WHERE document_id = ?1 AND version_number = ?2"
              ),
              rusqlite::params![id_str, version_number],
              RawVersion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }
}
