//! Versions: immutable content snapshots belonging to a document.
//!
//! Versions are append-only. Numbering is dense and 1-based per document;
//! the store never renumbers or backfills.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, document::DocumentStatus};

/// Why a version was written. Recorded for audit display only; it has no
/// bearing on which transitions are legal.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
  #[default]
  ManualEdit,
  AutoRegenerate,
  TemplateUpdate,
  DataUpdate,
}

impl ChangeType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ManualEdit => "manual_edit",
      Self::AutoRegenerate => "auto_regenerate",
      Self::TemplateUpdate => "template_update",
      Self::DataUpdate => "data_update",
    }
  }
}

impl fmt::Display for ChangeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ChangeType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "manual_edit" => Ok(Self::ManualEdit),
      "auto_regenerate" => Ok(Self::AutoRegenerate),
      "template_update" => Ok(Self::TemplateUpdate),
      "data_update" => Ok(Self::DataUpdate),
      other => Err(Error::Validation(format!("unknown change type: {other:?}"))),
    }
  }
}

/// An immutable content snapshot. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
  pub document_id:    Uuid,
  pub version_number: u32,
  pub content:        String,
  /// The document's status when this version was written.
  pub status_at_time: DocumentStatus,
  pub change_type:    ChangeType,
  pub change_reason:  Option<String>,
  pub created_by:     String,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::DocumentStore::append_version`].
/// The version number and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewVersion {
  pub content:       String,
  pub change_type:   ChangeType,
  pub change_reason: Option<String>,
  pub created_by:    String,
}

/// One page of a newest-first version listing.
///
/// Paging is keyed on version number rather than offset, so a version
/// appended mid-listing does not shift later pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub limit:  usize,
  /// Only return versions numbered strictly below this one.
  pub before: Option<u32>,
}

impl Page {
  pub const DEFAULT_LIMIT: usize = 50;

  pub fn first(limit: usize) -> Self { Self { limit, before: None } }
}

impl Default for Page {
  fn default() -> Self { Self::first(Self::DEFAULT_LIMIT) }
}
