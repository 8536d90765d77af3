//! Change-notifier implementations and the detached dispatch used by the
//! engine.

use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;
use tracing::{debug, warn};
use vellum_core::notify::{ChangeNotifier, DocumentChanged, NotifyError};

/// In-process fan-out over a [`broadcast`] channel.
///
/// Sending with no subscribers is not an error. Subscribers that fall behind
/// by more than the channel capacity miss events and are expected to re-fetch.
#[derive(Clone)]
pub struct BroadcastNotifier {
  sender: broadcast::Sender<DocumentChanged>,
}

impl BroadcastNotifier {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity);
    Self { sender }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<DocumentChanged> {
    self.sender.subscribe()
  }
}

impl ChangeNotifier for BroadcastNotifier {
  async fn notify(&self, event: DocumentChanged) -> Result<(), NotifyError> {
    let receivers = self.sender.send(event).unwrap_or(0);
    debug!(receivers, "broadcast document change");
    Ok(())
  }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ChangeNotifier for NullNotifier {
  async fn notify(&self, _event: DocumentChanged) -> Result<(), NotifyError> {
    Ok(())
  }
}

/// Deliver `event` on a detached task bounded by `budget`.
///
/// Failures and timeouts are logged and otherwise dropped.
pub(crate) fn dispatch<N: ChangeNotifier>(
  notifier: Arc<N>,
  event: DocumentChanged,
  budget: Duration,
) {
  tokio::spawn(async move {
    let document_id = event.document_id;
    match tokio::time::timeout(budget, notifier.notify(event)).await {
      Ok(Ok(())) => debug!(%document_id, "change notification delivered"),
      Ok(Err(error)) => {
        warn!(%document_id, %error, "change notification failed");
      }
      Err(_) => {
        warn!(%document_id, ?budget, "change notification timed out");
      }
    }
  });
}
