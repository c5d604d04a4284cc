//! Error types for `tenure-core`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{designation::Designation, employee::EmployeeId, promotion::EventId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("employee not found: {0}")]
  EmployeeNotFound(EmployeeId),

  #[error("employee {0} is inactive")]
  InactiveEmployee(EmployeeId),

  #[error("promotion event not found: {0}")]
  EventNotFound(EventId),

  /// Duplicate date, or a date outside the range allowed by the event's
  /// neighbours.
  #[error("date conflict for employee {employee_id} on {date}: {reason}")]
  DateConflict {
    employee_id: EmployeeId,
    date:        NaiveDate,
    reason:      String,
  },

  #[error("invalid sequence for employee {employee_id}: {reason}")]
  InvalidSequence {
    employee_id: EmployeeId,
    reason:      String,
  },

  #[error("unknown designation: {0}")]
  UnknownDesignation(Designation),

  /// Raised by batch pre-validation before any write happens.
  #[error("batch references unknown employees: {0:?}")]
  UnknownEmployees(Vec<EmployeeId>),

  /// A collaborator write (employee, catalog entry) collided with an
  /// existing row.
  #[error("already exists: {0}")]
  Duplicate(String),

  /// Lock contention or a stale read. Safe to retry.
  #[error("concurrent modification: {0}")]
  ConcurrentModification(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::EmployeeNotFound(_) => ErrorKind::EmployeeNotFound,
      Self::InactiveEmployee(_) => ErrorKind::InactiveEmployee,
      Self::EventNotFound(_) => ErrorKind::EventNotFound,
      Self::DateConflict { .. } => ErrorKind::DateConflict,
      Self::InvalidSequence { .. } => ErrorKind::InvalidSequence,
      Self::UnknownDesignation(_) => ErrorKind::UnknownDesignation,
      Self::UnknownEmployees(_) => ErrorKind::UnknownEmployees,
      Self::Duplicate(_) => ErrorKind::Duplicate,
      Self::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::ConcurrentModification(_))
  }
}

/// Stable, serialisable classification of an [`Error`]; used in batch reports
/// and HTTP error bodies.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  EmployeeNotFound,
  InactiveEmployee,
  EventNotFound,
  DateConflict,
  InvalidSequence,
  UnknownDesignation,
  UnknownEmployees,
  Duplicate,
  ConcurrentModification,
  Storage,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_strings_are_snake_case() {
    let err = Error::DateConflict {
      employee_id: EmployeeId(7),
      date:        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
      reason:      "duplicate".into(),
    };
    assert_eq!(err.kind().to_string(), "date_conflict");
    assert_eq!(
      serde_json::to_value(ErrorKind::ConcurrentModification).unwrap(),
      serde_json::json!("concurrent_modification")
    );
  }

  #[test]
  fn only_contention_is_retryable() {
    assert!(Error::ConcurrentModification("busy".into()).is_retryable());
    assert!(!Error::InactiveEmployee(EmployeeId(1)).is_retryable());
  }
}
