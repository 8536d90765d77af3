use std::time::Duration;

use serde::Deserialize;
use vellum_core::consent::MIN_REASON_CHARS;

/// Tunables for [`Engine`](crate::Engine).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Upper bound on a single notification delivery. A slower notifier is
  /// abandoned; the committed change stands.
  #[serde(rename = "notify_timeout_ms", with = "millis")]
  pub notify_timeout:          Duration,
  pub min_cancellation_reason: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      notify_timeout:          Duration::from_secs(2),
      min_cancellation_reason: MIN_REASON_CHARS,
    }
  }
}

mod millis {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    Ok(Duration::from_millis(u64::deserialize(d)?))
  }
}
