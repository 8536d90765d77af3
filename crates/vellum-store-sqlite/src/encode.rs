//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enums are stored as their
//! snake_case names. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use vellum_core::{
  document::{Document, DocumentStatus, Party},
  version::{ChangeType, Version},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<DocumentStatus> {
  s.parse().map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn decode_party(s: &str) -> Result<Party> {
  s.parse().map_err(|_| Error::Decode(format!("unknown party: {s:?}")))
}

pub fn decode_change_type(s: &str) -> Result<ChangeType> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown change type: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawDocument::from_row`].
pub const DOCUMENT_COLUMNS: &str = "document_id, subject_id, status, \
  current_version, content, template_ref, signed_at, cancelled_at, \
  cancellation_reason, cancellation_requested_by, created_by, created_at, \
  updated_at";

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:               String,
  pub subject_id:                String,
  pub status:                    String,
  pub current_version:           u32,
  pub content:                   String,
  pub template_ref:              Option<String>,
  pub signed_at:                 Option<String>,
  pub cancelled_at:              Option<String>,
  pub cancellation_reason:       Option<String>,
  pub cancellation_requested_by: Option<String>,
  pub created_by:                String,
  pub created_at:                String,
  pub updated_at:                String,
}

impl RawDocument {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:               row.get(0)?,
      subject_id:                row.get(1)?,
      status:                    row.get(2)?,
      current_version:           row.get(3)?,
      content:                   row.get(4)?,
      template_ref:              row.get(5)?,
      signed_at:                 row.get(6)?,
      cancelled_at:              row.get(7)?,
      cancellation_reason:       row.get(8)?,
      cancellation_requested_by: row.get(9)?,
      created_by:                row.get(10)?,
      created_at:                row.get(11)?,
      updated_at:                row.get(12)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id:               decode_uuid(&self.document_id)?,
      subject_id:                decode_uuid(&self.subject_id)?,
      status:                    decode_status(&self.status)?,
      current_version:           self.current_version,
      content:                   self.content,
      template_ref:              self.template_ref,
      signed_at:                 decode_opt_dt(self.signed_at)?,
      cancelled_at:              decode_opt_dt(self.cancelled_at)?,
      cancellation_reason:       self.cancellation_reason,
      cancellation_requested_by: self
        .cancellation_requested_by
        .as_deref()
        .map(decode_party)
        .transpose()?,
      created_by:                self.created_by,
      created_at:                decode_dt(&self.created_at)?,
      updated_at:                decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawVersion::from_row`].
pub const VERSION_COLUMNS: &str = "document_id, version_number, content, \
  status_at_time, change_type, change_reason, created_by, created_at";

/// Raw values read directly from a `versions` row.
pub struct RawVersion {
  pub document_id:    String,
  pub version_number: u32,
  pub content:        String,
  pub status_at_time: String,
  pub change_type:    String,
  pub change_reason:  Option<String>,
  pub created_by:     String,
  pub created_at:     String,
}

impl RawVersion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:    row.get(0)?,
      version_number: row.get(1)?,
      content:        row.get(2)?,
      status_at_time: row.get(3)?,
      change_type:    row.get(4)?,
      change_reason:  row.get(5)?,
      created_by:     row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_version(self) -> Result<Version> {
    Ok(Version {
      document_id:    decode_uuid(&self.document_id)?,
      version_number: self.version_number,
      content:        self.content,
      status_at_time: decode_status(&self.status_at_time)?,
      change_type:    decode_change_type(&self.change_type)?,
      change_reason:  self.change_reason,
      created_by:     self.created_by,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// The `(version, status)` currently persisted for a document, used to explain
/// why a guarded write touched no rows.
pub struct RawRevision {
  pub version: u32,
  pub status:  String,
}

/// Turn a failed revision check into the domain error the caller sees.
pub fn diagnose(
  expected: &vellum_core::document::Revision,
  current: Option<RawRevision>,
) -> Result<vellum_core::Error> {
  let Some(current) = current else {
    return Ok(vellum_core::Error::DocumentNotFound(expected.document_id));
  };
  if current.version != expected.version {
    return Ok(vellum_core::Error::ConcurrentVersionConflict {
      document_id: expected.document_id,
      expected:    expected.version,
      found:       current.version,
    });
  }
  Ok(vellum_core::Error::StatusChanged {
    document_id: expected.document_id,
    expected:    expected.status,
    found:       decode_status(&current.status)?,
  })
}
