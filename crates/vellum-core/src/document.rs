//! Documents: the versioned, status-tracked contract entity.
//!
//! A document belongs to exactly one subject (the business transaction it is
//! attached to). Its body lives in an append-only series of versions; the
//! newest version's content is denormalised onto the document for fast reads.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Parties ─────────────────────────────────────────────────────────────────

/// One of the two sides able to drive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
  /// The business that authors and publishes the document.
  Owner,
  /// The client who reviews and signs it.
  Counterparty,
}

impl Party {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Owner => "owner",
      Self::Counterparty => "counterparty",
    }
  }
}

impl fmt::Display for Party {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Party {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "owner" => Ok(Self::Owner),
      "counterparty" => Ok(Self::Counterparty),
      other => Err(Error::Validation(format!("unknown party: {other:?}"))),
    }
  }
}

/// Who is performing an operation: an opaque identity plus the side they act
/// for. The identity is recorded as `created_by` on versions they write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:    String,
  pub party: Party,
}

impl Actor {
  pub fn owner(id: impl Into<String>) -> Self {
    Self { id: id.into(), party: Party::Owner }
  }

  pub fn counterparty(id: impl Into<String>) -> Self {
    Self { id: id.into(), party: Party::Counterparty }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a document is in its lifecycle. Only [`crate::lifecycle`] decides
/// which status may follow which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
  Draft,
  Published,
  Signed,
  CancellationRequestedByOwner,
  CancellationRequestedByCounterparty,
  Cancelled,
}

impl DocumentStatus {
  /// The pending-cancellation status opened by `party`.
  pub fn cancellation_requested_by(party: Party) -> Self {
    match party {
      Party::Owner => Self::CancellationRequestedByOwner,
      Party::Counterparty => Self::CancellationRequestedByCounterparty,
    }
  }

  /// The party whose cancellation request is outstanding, if any.
  pub fn pending_requester(self) -> Option<Party> {
    match self {
      Self::CancellationRequestedByOwner => Some(Party::Owner),
      Self::CancellationRequestedByCounterparty => Some(Party::Counterparty),
      _ => None,
    }
  }

  /// Every status except `Cancelled` counts towards the one-active-document
  /// rule for a subject.
  pub fn is_active(self) -> bool { !matches!(self, Self::Cancelled) }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Published => "published",
      Self::Signed => "signed",
      Self::CancellationRequestedByOwner => "cancellation_requested_by_owner",
      Self::CancellationRequestedByCounterparty => {
        "cancellation_requested_by_counterparty"
      }
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for DocumentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DocumentStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "draft" => Ok(Self::Draft),
      "published" => Ok(Self::Published),
      "signed" => Ok(Self::Signed),
      "cancellation_requested_by_owner" => Ok(Self::CancellationRequestedByOwner),
      "cancellation_requested_by_counterparty" => {
        Ok(Self::CancellationRequestedByCounterparty)
      }
      "cancelled" => Ok(Self::Cancelled),
      other => Err(Error::Validation(format!("unknown status: {other:?}"))),
    }
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// The contract record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub document_id:               Uuid,
  /// The business transaction (booking, event, ...) this document is for.
  pub subject_id:                Uuid,
  pub status:                    DocumentStatus,
  /// Equals the number of versions written so far; starts at 1.
  pub current_version:           u32,
  /// Content of version `current_version`.
  pub content:                   String,
  /// Template the document was generated from; `None` for manual content.
  pub template_ref:              Option<String>,
  /// Set by the first transition into `Signed`; never cleared.
  pub signed_at:                 Option<DateTime<Utc>>,
  pub cancelled_at:              Option<DateTime<Utc>>,
  pub cancellation_reason:       Option<String>,
  pub cancellation_requested_by: Option<Party>,
  pub created_by:                String,
  pub created_at:                DateTime<Utc>,
  pub updated_at:                DateTime<Utc>,
}

impl Document {
  /// The optimistic-concurrency token a write must match.
  pub fn revision(&self) -> Revision {
    Revision {
      document_id: self.document_id,
      version:     self.current_version,
      status:      self.status,
    }
  }

  pub fn is_active(&self) -> bool { self.status.is_active() }
}

/// The `(version, status)` pair a write was planned against. Stores reject a
/// write whose revision no longer matches the persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
  pub document_id: Uuid,
  pub version:     u32,
  pub status:      DocumentStatus,
}

// ─── Creation input ──────────────────────────────────────────────────────────

/// Where the first version's body comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DocumentSource {
  /// Fetch the body from the template store.
  Template(String),
  /// Use caller-authored content verbatim.
  Content(String),
}

/// Input to [`crate::store::DocumentStore::create_document`].
/// Identifiers and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub subject_id:   Uuid,
  pub content:      String,
  pub template_ref: Option<String>,
  pub change_type:  crate::version::ChangeType,
  pub created_by:   String,
}
