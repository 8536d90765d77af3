//! Error type for `vellum-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain failure detected inside a transaction (revision mismatch,
  /// second active document, ...).
  #[error(transparent)]
  Core(#[from] vellum_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("column decode error: {0}")]
  Decode(String),
}

impl From<Error> for vellum_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      other => vellum_core::Error::Storage(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
