//! Error types for the tenure-sheet adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Serial 60 in the 1900 date system names 1900-02-29, which never
  /// existed.
  #[error("serial 60 is the nonexistent 1900-02-29")]
  PhantomLeapDay,

  #[error("serial date out of range: {0}")]
  SerialOutOfRange(f64),

  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("missing column: {0}")]
  MissingColumn(&'static str),

  #[error("row {row}: {reason}")]
  InvalidRow { row: usize, reason: String },

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn row(row: usize, reason: impl std::fmt::Display) -> Self {
    Self::InvalidRow { row, reason: reason.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
