//! The document status state machine.
//!
//! [`transition`] is the single source of truth for which operation may be
//! performed by which party in which status. Everything that mutates a
//! document's status goes through [`advance`], which also stamps the
//! once-only timestamps and the cancellation bookkeeping.
//!
//! | From | Operation | Party | To |
//! |------|-----------|-------|----|
//! | (none) | generate  | owner | draft |
//! | draft, published | edit, regenerate | owner | (unchanged, new version) |
//! | draft | publish | owner | published |
//! | draft, published | delete | owner | (removed) |
//! | published | sign | counterparty | signed |
//! | signed | request cancellation | either | cancellation requested by that party |
//! | requested by X | confirm | not X | cancelled |
//! | requested by X | reject | not X | signed |
//! | requested by X | withdraw | X | signed |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  document::{Document, DocumentStatus, Party},
};

// ─── Operations ──────────────────────────────────────────────────────────────

/// Every operation that can be attempted against a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  Generate,
  Edit,
  Regenerate,
  Publish,
  Sign,
  Delete,
  RequestCancellation,
  ConfirmCancellation,
  RejectCancellation,
  WithdrawCancellation,
}

impl Operation {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Generate => "generate",
      Self::Edit => "edit",
      Self::Regenerate => "regenerate",
      Self::Publish => "publish",
      Self::Sign => "sign",
      Self::Delete => "delete",
      Self::RequestCancellation => "request cancellation",
      Self::ConfirmCancellation => "confirm cancellation",
      Self::RejectCancellation => "reject cancellation",
      Self::WithdrawCancellation => "withdraw cancellation",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// What a legal operation does to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Append a new version; status stays where it is.
  Revise,
  /// Move to a new status without touching content.
  Move(DocumentStatus),
  /// Remove the document entirely.
  Remove,
}

/// Decide whether `party` may perform `operation` on a document currently in
/// `status`, and what it does if so.
pub fn transition(
  status: DocumentStatus,
  operation: Operation,
  party: Party,
) -> Result<Transition> {
  use DocumentStatus::*;
  use Operation::*;

  let invalid = || Error::InvalidTransition {
    status: Some(status),
    operation,
    party,
  };

  match (status, operation) {
    (Draft | Published, Edit | Regenerate) if party == Party::Owner => {
      Ok(Transition::Revise)
    }
    (Draft, Publish) if party == Party::Owner => Ok(Transition::Move(Published)),
    (Draft | Published, Delete) if party == Party::Owner => Ok(Transition::Remove),
    (Published, Sign) if party == Party::Counterparty => {
      Ok(Transition::Move(Signed))
    }
    (Signed, RequestCancellation) => Ok(Transition::Move(
      DocumentStatus::cancellation_requested_by(party),
    )),
    (
      CancellationRequestedByOwner | CancellationRequestedByCounterparty,
      RequestCancellation,
    ) => match status.pending_requester() {
      Some(by) if by == party => Err(Error::AlreadyRequested { by }),
      _ => Err(invalid()),
    },
    (
      CancellationRequestedByOwner | CancellationRequestedByCounterparty,
      ConfirmCancellation | RejectCancellation,
    ) => {
      if status.pending_requester() == Some(party) {
        return Err(Error::SelfConfirmationForbidden { party });
      }
      Ok(Transition::Move(if operation == ConfirmCancellation {
        Cancelled
      } else {
        Signed
      }))
    }
    (
      CancellationRequestedByOwner | CancellationRequestedByCounterparty,
      WithdrawCancellation,
    ) if status.pending_requester() == Some(party) => Ok(Transition::Move(Signed)),
    _ => Err(invalid()),
  }
}

/// Check that `party` may create a new document. Only owners author.
pub fn genesis(party: Party) -> Result<()> {
  if party != Party::Owner {
    return Err(Error::InvalidTransition {
      status: None,
      operation: Operation::Generate,
      party,
    });
  }
  Ok(())
}

/// Check that `party` may write `content` as a new version of `document`.
pub fn revise(
  document: &Document,
  operation: Operation,
  party: Party,
  content: &str,
) -> Result<()> {
  match transition(document.status, operation, party)? {
    Transition::Revise => require_content(content),
    _ => Err(Error::InvalidTransition {
      status: Some(document.status),
      operation,
      party,
    }),
  }
}

/// Check that `party` may delete `document`.
pub fn remove(document: &Document, party: Party) -> Result<()> {
  match transition(document.status, Operation::Delete, party)? {
    Transition::Remove => Ok(()),
    _ => Err(Error::InvalidTransition {
      status: Some(document.status),
      operation: Operation::Delete,
      party,
    }),
  }
}

/// Apply a status-moving operation, returning the document as it should be
/// persisted. Content and version are never touched here.
pub fn advance(
  document: &Document,
  operation: Operation,
  party: Party,
  at: DateTime<Utc>,
) -> Result<Document> {
  let to = match transition(document.status, operation, party)? {
    Transition::Move(to) => to,
    _ => {
      return Err(Error::InvalidTransition {
        status: Some(document.status),
        operation,
        party,
      });
    }
  };

  if operation == Operation::Publish {
    require_content(&document.content)?;
  }

  let mut next = document.clone();
  next.status = to;
  next.updated_at = at;

  match to {
    DocumentStatus::Signed => {
      next.signed_at.get_or_insert(at);
      next.cancellation_reason = None;
      next.cancellation_requested_by = None;
    }
    DocumentStatus::Cancelled => {
      next.cancelled_at = Some(at);
    }
    requested => {
      if let Some(by) = requested.pending_requester() {
        next.cancellation_requested_by = Some(by);
      }
    }
  }

  Ok(next)
}

/// Document bodies must contain something other than whitespace.
pub fn require_content(content: &str) -> Result<()> {
  if content.trim().is_empty() {
    return Err(Error::Validation("content must not be empty".into()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;

  fn doc(status: DocumentStatus) -> Document {
    let ts = Utc.timestamp_opt(0, 0).unwrap();
    Document {
      document_id: Uuid::nil(),
      subject_id: Uuid::nil(),
      status,
      current_version: 1,
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
  fn owner_edits_draft_and_published() {
    for status in [DocumentStatus::Draft, DocumentStatus::Published] {
      assert_eq!(
        transition(status, Operation::Edit, Party::Owner).unwrap(),
        Transition::Revise
      );
    }
  }

  #[test]
  fn signed_and_cancelled_are_read_only() {
    for status in [DocumentStatus::Signed, DocumentStatus::Cancelled] {
      for op in [Operation::Edit, Operation::Delete, Operation::Regenerate] {
        let err = transition(status, op, Party::Owner).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }), "{op} in {status}");
      }
    }
  }

  #[test]
  fn counterparty_cannot_edit() {
    let err =
      transition(DocumentStatus::Draft, Operation::Edit, Party::Counterparty)
        .unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { status: Some(DocumentStatus::Draft), .. }
    ));
  }

  #[test]
  fn only_counterparty_signs_published() {
    assert!(transition(DocumentStatus::Published, Operation::Sign, Party::Owner).is_err());
    assert!(transition(DocumentStatus::Draft, Operation::Sign, Party::Counterparty).is_err());
    assert_eq!(
      transition(DocumentStatus::Published, Operation::Sign, Party::Counterparty)
        .unwrap(),
      Transition::Move(DocumentStatus::Signed)
    );
  }

  #[test]
  fn publishing_twice_is_invalid() {
    let err = transition(DocumentStatus::Published, Operation::Publish, Party::Owner)
      .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
  }

  #[test]
  fn same_party_cannot_request_twice() {
    let err = transition(
      DocumentStatus::CancellationRequestedByOwner,
      Operation::RequestCancellation,
      Party::Owner,
    )
    .unwrap_err();
    assert!(matches!(err, Error::AlreadyRequested { by: Party::Owner }));
  }

  #[test]
  fn requester_cannot_settle_own_request() {
    for op in [Operation::ConfirmCancellation, Operation::RejectCancellation] {
      let err = transition(
        DocumentStatus::CancellationRequestedByCounterparty,
        op,
        Party::Counterparty,
      )
      .unwrap_err();
      assert!(matches!(
        err,
        Error::SelfConfirmationForbidden { party: Party::Counterparty }
      ));
    }
  }

  #[test]
  fn only_requester_withdraws() {
    assert!(transition(
      DocumentStatus::CancellationRequestedByOwner,
      Operation::WithdrawCancellation,
      Party::Counterparty,
    )
    .is_err());
    assert_eq!(
      transition(
        DocumentStatus::CancellationRequestedByOwner,
        Operation::WithdrawCancellation,
        Party::Owner,
      )
      .unwrap(),
      Transition::Move(DocumentStatus::Signed)
    );
  }

  #[test]
  fn only_owner_generates() {
    assert!(genesis(Party::Owner).is_ok());
    assert!(matches!(
      genesis(Party::Counterparty),
      Err(Error::InvalidTransition { status: None, .. })
    ));
  }

  #[test]
  fn blank_content_is_invalid() {
    assert!(matches!(require_content("  \n"), Err(Error::Validation(_))));
    assert!(require_content("Terms").is_ok());
  }

  #[test]
  fn sign_stamps_signed_at_once() {
    let t1 = Utc.timestamp_opt(100, 0).unwrap();
    let t2 = Utc.timestamp_opt(200, 0).unwrap();

    let signed =
      advance(&doc(DocumentStatus::Published), Operation::Sign, Party::Counterparty, t1)
        .unwrap();
    assert_eq!(signed.signed_at, Some(t1));

    let requested =
      advance(&signed, Operation::RequestCancellation, Party::Owner, t2).unwrap();
    assert_eq!(requested.cancellation_requested_by, Some(Party::Owner));

    let back =
      advance(&requested, Operation::RejectCancellation, Party::Counterparty, t2)
        .unwrap();
    assert_eq!(back.status, DocumentStatus::Signed);
    assert_eq!(back.signed_at, Some(t1));
    assert_eq!(back.cancellation_requested_by, None);
  }

  #[test]
  fn advance_rejects_revise_operations() {
    let now = Utc::now();
    let err = advance(&doc(DocumentStatus::Draft), Operation::Edit, Party::Owner, now)
      .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
  }

  #[test]
  fn publish_requires_content() {
    let mut empty = doc(DocumentStatus::Draft);
    empty.content = String::new();
    let err = advance(&empty, Operation::Publish, Party::Owner, Utc::now()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
