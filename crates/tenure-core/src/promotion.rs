//! Promotion events — the nodes of an employee's designation chain.
//!
//! Events for one employee, ordered by `effective_date`, form a chain linked
//! by designation equality: each event's `from_designation` is the previous
//! event's `to_designation` (or the employee's initial designation for the
//! first event).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{designation::Designation, employee::EmployeeId};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A persisted chain node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionEvent {
  /// Assigned by the store on creation.
  pub event_id:         EventId,
  pub employee_id:      EmployeeId,
  /// The designation held immediately before this event. Always computed by
  /// the engine, never accepted from callers.
  pub from_designation: Designation,
  pub to_designation:   Designation,
  pub effective_date:   NaiveDate,
  /// Auxiliary grade; not part of the ordering invariant.
  pub level:            i32,
  pub remarks:          Option<String>,
}

/// A fully-linked event that has not been assigned an id yet.
/// Input to [`crate::store::ChainTx::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
  pub employee_id:      EmployeeId,
  pub from_designation: Designation,
  pub to_designation:   Designation,
  pub effective_date:   NaiveDate,
  pub level:            i32,
  pub remarks:          Option<String>,
}

impl EventDraft {
  pub fn into_event(self, event_id: EventId) -> PromotionEvent {
    PromotionEvent {
      event_id,
      employee_id: self.employee_id,
      from_designation: self.from_designation,
      to_designation: self.to_designation,
      effective_date: self.effective_date,
      level: self.level,
      remarks: self.remarks,
    }
  }
}

// ─── Caller input ────────────────────────────────────────────────────────────

/// The caller-controlled fields of an event, shared by append, insert and
/// update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
  pub to_designation: Designation,
  pub effective_date: NaiveDate,
  #[serde(default)]
  pub level:          i32,
  #[serde(default)]
  pub remarks:        Option<String>,
}

impl Promotion {
  /// Convenience constructor with no remarks.
  pub fn new(
    to_designation: impl Into<Designation>,
    effective_date: NaiveDate,
    level: i32,
  ) -> Self {
    Self {
      to_designation: to_designation.into(),
      effective_date,
      level,
      remarks: None,
    }
  }

  pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
    self.remarks = Some(remarks.into());
    self
  }
}

/// One row of an externally supplied batch, already converted to calendar
/// dates. Input to [`crate::reconcile::Reconciler::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEvent {
  pub employee_id: EmployeeId,
  #[serde(flatten)]
  pub promotion:   Promotion,
}
