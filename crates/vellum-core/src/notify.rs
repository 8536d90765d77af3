//! Change notifications for external viewers.
//!
//! A notification is a cache-invalidation signal, not a state carrier:
//! consumers re-fetch the document rather than trusting the payload.
//! Delivery is at-most-once.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Document, DocumentStatus};

/// "Document X changed", published after a write commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChanged {
  pub document_id: Uuid,
  pub subject_id:  Uuid,
  /// `None` once the document has been deleted.
  pub status:      Option<DocumentStatus>,
  pub version:     u32,
  pub at:          DateTime<Utc>,
}

impl DocumentChanged {
  pub fn updated(document: &Document) -> Self {
    Self {
      document_id: document.document_id,
      subject_id:  document.subject_id,
      status:      Some(document.status),
      version:     document.current_version,
      at:          document.updated_at,
    }
  }

  pub fn deleted(document: &Document, at: DateTime<Utc>) -> Self {
    Self {
      document_id: document.document_id,
      subject_id:  document.subject_id,
      status:      None,
      version:     document.current_version,
      at,
    }
  }
}

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound port for change notifications. Failures are logged by the caller
/// and never roll back the change that triggered them.
pub trait ChangeNotifier: Send + Sync + 'static {
  fn notify(
    &self,
    event: DocumentChanged,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + '_;
}
