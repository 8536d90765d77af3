//! Bilateral consent for cancelling a signed document.
//!
//! Either party may open a cancellation request, and only the other party
//! can close it (confirm or reject). The requester may withdraw their own
//! request. None of these steps writes a version: cancellation metadata is
//! structural, not content.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  document::{Document, Party},
  lifecycle::{Operation, advance},
};

/// Minimum length, in characters, of a cancellation reason.
pub const MIN_REASON_CHARS: usize = 10;

/// Open a cancellation request on a signed document.
pub fn request(
  document: &Document,
  party: Party,
  reason: &str,
  min_reason_chars: usize,
  at: DateTime<Utc>,
) -> Result<Document> {
  let mut next = advance(document, Operation::RequestCancellation, party, at)?;

  let reason = reason.trim();
  let len = reason.chars().count();
  if len < min_reason_chars {
    return Err(Error::Validation(format!(
      "cancellation reason must be at least {min_reason_chars} characters \
       (got {len})"
    )));
  }
  next.cancellation_reason = Some(reason.to_owned());
  Ok(next)
}

/// The non-requesting party agrees; the document becomes cancelled.
pub fn confirm(
  document: &Document,
  party: Party,
  at: DateTime<Utc>,
) -> Result<Document> {
  advance(document, Operation::ConfirmCancellation, party, at)
}

/// The non-requesting party declines; the document returns to signed.
pub fn reject(
  document: &Document,
  party: Party,
  at: DateTime<Utc>,
) -> Result<Document> {
  advance(document, Operation::RejectCancellation, party, at)
}

/// The requester takes their request back; the document returns to signed.
pub fn withdraw(
  document: &Document,
  party: Party,
  at: DateTime<Utc>,
) -> Result<Document> {
  advance(document, Operation::WithdrawCancellation, party, at)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;
  use crate::document::DocumentStatus;

  fn signed() -> Document {
    let ts = Utc.timestamp_opt(0, 0).unwrap();
    Document {
      document_id: Uuid::new_v4(),
      subject_id: Uuid::new_v4(),
      status: DocumentStatus::Signed,
      current_version: 3,
      content: "Terms".into(),
      template_ref: None,
      signed_at: Some(ts),
      cancelled_at: None,
      cancellation_reason: None,
      cancellation_requested_by: None,
      created_by: "studio".into(),
      created_at: ts,
      updated_at: ts,
    }
  }

  #[test]
  fn short_reason_is_rejected() {
    // Nine characters once trimmed.
    let err = request(&signed(), Party::Owner, "  too short ", MIN_REASON_CHARS, Utc::now())
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert!(request(&signed(), Party::Owner, "ten chars!", MIN_REASON_CHARS, Utc::now()).is_ok());
  }

  #[test]
  fn request_records_reason_and_requester() {
    let next = request(
      &signed(),
      Party::Counterparty,
      "event was moved",
      MIN_REASON_CHARS,
      Utc::now(),
    )
    .unwrap();
    assert_eq!(next.status, DocumentStatus::CancellationRequestedByCounterparty);
    assert_eq!(next.cancellation_requested_by, Some(Party::Counterparty));
    assert_eq!(next.cancellation_reason.as_deref(), Some("event was moved"));
    assert_eq!(next.current_version, 3);
  }

  #[test]
  fn confirm_by_other_party_cancels() {
    let at = Utc.timestamp_opt(500, 0).unwrap();
    let pending =
      request(&signed(), Party::Owner, "not needed anymore", MIN_REASON_CHARS, at)
        .unwrap();

    let err = confirm(&pending, Party::Owner, at).unwrap_err();
    assert!(matches!(err, Error::SelfConfirmationForbidden { .. }));

    let done = confirm(&pending, Party::Counterparty, at).unwrap();
    assert_eq!(done.status, DocumentStatus::Cancelled);
    assert_eq!(done.cancelled_at, Some(at));
  }

  #[test]
  fn reject_clears_request_and_allows_new_one() {
    let pending = request(
      &signed(),
      Party::Owner,
      "not needed anymore",
      MIN_REASON_CHARS,
      Utc::now(),
    )
    .unwrap();
    let back = reject(&pending, Party::Counterparty, Utc::now()).unwrap();
    assert_eq!(back.status, DocumentStatus::Signed);
    assert_eq!(back.cancellation_reason, None);
    assert_eq!(back.cancellation_requested_by, None);

    assert!(request(&back, Party::Owner, "still not needed", MIN_REASON_CHARS, Utc::now())
      .is_ok());
  }

  #[test]
  fn withdraw_only_by_requester() {
    let pending = request(
      &signed(),
      Party::Owner,
      "not needed anymore",
      MIN_REASON_CHARS,
      Utc::now(),
    )
    .unwrap();
    assert!(withdraw(&pending, Party::Counterparty, Utc::now()).is_err());
    let back = withdraw(&pending, Party::Owner, Utc::now()).unwrap();
    assert_eq!(back.status, DocumentStatus::Signed);
    assert_eq!(back.cancellation_reason, None);
  }

  #[test]
  fn cannot_request_before_signature() {
    let mut draft = signed();
    draft.status = DocumentStatus::Published;
    draft.signed_at = None;
    let err = request(&draft, Party::Owner, "not needed anymore", MIN_REASON_CHARS, Utc::now())
      .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
  }
}
