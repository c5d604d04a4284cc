//! Error type for `tenure-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tenure_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  #[error("unknown employee status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for tenure_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      Error::Database(tokio_rusqlite::Error::Rusqlite(db)) => classify(db),
      other => tenure_core::Error::storage(other),
    }
  }
}

/// Map a raw SQLite failure onto the core taxonomy. Lock contention becomes
/// the retryable [`tenure_core::Error::ConcurrentModification`].
pub(crate) fn classify(e: rusqlite::Error) -> tenure_core::Error {
  if is_code(&e, &[ErrorCode::DatabaseBusy, ErrorCode::DatabaseLocked]) {
    tenure_core::Error::ConcurrentModification(e.to_string())
  } else {
    tenure_core::Error::storage(e)
  }
}

pub(crate) fn is_constraint(e: &rusqlite::Error) -> bool {
  is_code(e, &[ErrorCode::ConstraintViolation])
}

fn is_code(e: &rusqlite::Error, codes: &[ErrorCode]) -> bool {
  matches!(e, rusqlite::Error::SqliteFailure(f, _) if codes.contains(&f.code))
}
