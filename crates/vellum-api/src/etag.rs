//! ETag computation and `If-Match` checks for documents.
//!
//! A document's ETag is a SHA-256 over its id, current version and status, so
//! any content edit or status move yields a new tag.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};
use vellum_core::document::Document;

use crate::error::ApiError;

/// Compute the quoted ETag for `document`.
pub fn compute_etag(document: &Document) -> String {
  let mut hasher = Sha256::new();
  hasher.update(document.document_id.as_bytes());
  hasher.update(document.current_version.to_le_bytes());
  hasher.update(document.status.as_str().as_bytes());
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// The raw `If-Match` value, if the client sent one.
pub fn if_match(headers: &HeaderMap) -> Option<&str> {
  headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok())
}

/// Fail with 412 unless `expected` (an `If-Match` value) names `document`.
///
/// `*` matches any existing document. Quoted and bare tags are both accepted.
pub fn check_if_match(document: &Document, expected: &str) -> Result<(), ApiError> {
  let current = compute_etag(document);
  let matched = expected
    .split(',')
    .map(|tag| strip_etag_quotes(tag.trim().trim_start_matches("W/")))
    .any(|tag| tag == "*" || tag == strip_etag_quotes(&current));
  if matched { Ok(()) } else { Err(ApiError::PreconditionFailed) }
}

fn strip_etag_quotes(s: &str) -> &str { s.trim_matches('"') }

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use uuid::Uuid;
  use vellum_core::document::DocumentStatus;

  use super::*;

  fn doc(version: u32, status: DocumentStatus) -> Document {
    let ts = Utc.timestamp_opt(0, 0).unwrap();
    Document {
      document_id: Uuid::nil(),
      subject_id: Uuid::nil(),
      status,
      current_version: version,
      content: "Terms".into(),
      template_ref: None,
      signed_at: None,
      cancelled_at: None,
      cancellation_reason: None,
      cancellation_requested_by: None,
      created_by: "studio".into(),
      created_at: ts,
      updated_at: ts,
    }
  }

  #[test]
  fn version_and_status_both_change_the_tag() {
    let base = compute_etag(&doc(1, DocumentStatus::Draft));
    assert_ne!(base, compute_etag(&doc(2, DocumentStatus::Draft)));
    assert_ne!(base, compute_etag(&doc(1, DocumentStatus::Published)));
    assert_eq!(base, compute_etag(&doc(1, DocumentStatus::Draft)));
  }

  #[test]
  fn if_match_accepts_bare_quoted_and_wildcard() {
    let d = doc(3, DocumentStatus::Signed);
    let tag = compute_etag(&d);
    assert!(check_if_match(&d, &tag).is_ok());
    assert!(check_if_match(&d, tag.trim_matches('"')).is_ok());
    assert!(check_if_match(&d, "*").is_ok());
    assert!(check_if_match(&d, &format!("\"stale\", {tag}")).is_ok());
    assert!(matches!(
      check_if_match(&d, "\"stale\""),
      Err(ApiError::PreconditionFailed)
    ));
  }
}
