//! The chain integrity engine.
//!
//! Every mutation runs inside a single [`ChainStore::transact`] call, so the
//! new or changed event, any neighbour relink and the employee's cached
//! current designation commit together or not at all.
//!
//! The `*_in` functions hold the actual rules. They operate on an open
//! [`ChainTx`] so the reconciler can reuse them inside its own per-employee
//! transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{debug, info};

use crate::{
  Error, Result,
  designation::Designation,
  employee::{Employee, EmployeeId},
  promotion::{EventDraft, EventId, Promotion, PromotionEvent},
  store::{ChainStore, ChainTx},
};

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Single-event mutations over a [`ChainStore`].
///
/// The engine borrows its store; build one per request.
pub struct ChainEngine<'s, S> {
  store: &'s S,
}

impl<'s, S: ChainStore> ChainEngine<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Add the next event in time.
  ///
  /// `effective_date` must be strictly after the current tail's date (or the
  /// hire date for an empty chain); otherwise fails with
  /// [`Error::InvalidSequence`].
  pub async fn append(
    &self,
    employee_id: EmployeeId,
    promotion: Promotion,
  ) -> Result<PromotionEvent> {
    let event = self
      .store
      .transact(employee_id, move |tx| append_in(tx, promotion))
      .await?;
    info!(
      employee_id = %employee_id,
      event_id = %event.event_id,
      to = %event.to_designation,
      date = %event.effective_date,
      "appended promotion"
    );
    Ok(event)
  }

  /// Insert an event anywhere in the timeline, relinking its successor.
  pub async fn insert_at(
    &self,
    employee_id: EmployeeId,
    promotion: Promotion,
  ) -> Result<PromotionEvent> {
    let event = self
      .store
      .transact(employee_id, move |tx| insert_in(tx, promotion))
      .await?;
    info!(
      employee_id = %employee_id,
      event_id = %event.event_id,
      to = %event.to_designation,
      date = %event.effective_date,
      "inserted promotion"
    );
    Ok(event)
  }

  /// Change an event's target designation, date, level or remarks.
  ///
  /// The new date must stay strictly between the event's current neighbours;
  /// moves across a neighbour are rejected with [`Error::DateConflict`].
  pub async fn update(
    &self,
    event_id: EventId,
    promotion: Promotion,
  ) -> Result<PromotionEvent> {
    let employee_id = self.owner_of(event_id).await?;
    let event = self
      .store
      .transact(employee_id, move |tx| update_in(tx, event_id, promotion))
      .await?;
    info!(employee_id = %employee_id, event_id = %event_id, "updated promotion");
    Ok(event)
  }

  /// Remove an event, relinking its successor to its predecessor. Returns the
  /// removed event.
  pub async fn delete(&self, event_id: EventId) -> Result<PromotionEvent> {
    let employee_id = self.owner_of(event_id).await?;
    let removed = self
      .store
      .transact(employee_id, move |tx| delete_in(tx, event_id))
      .await?;
    info!(employee_id = %employee_id, event_id = %event_id, "deleted promotion");
    Ok(removed)
  }

  async fn owner_of(&self, event_id: EventId) -> Result<EmployeeId> {
    self
      .store
      .find_event(event_id)
      .await?
      .map(|e| e.employee_id)
      .ok_or(Error::EventNotFound(event_id))
  }
}

// ─── Transactional rules ─────────────────────────────────────────────────────

pub(crate) fn append_in(
  tx: &mut dyn ChainTx,
  promotion: Promotion,
) -> Result<PromotionEvent> {
  let employee = active_employee(tx)?;
  known_designation(tx, &promotion.to_designation)?;

  let tail = tx.tail()?;
  let floor = tail
    .as_ref()
    .map_or(employee.hired_on, |t| t.effective_date);
  if promotion.effective_date <= floor {
    return Err(Error::InvalidSequence {
      employee_id: employee.employee_id,
      reason:      format!(
        "{} is not after the latest chain date {floor}",
        promotion.effective_date
      ),
    });
  }

  let from = tail.map_or_else(
    || employee.initial_designation.clone(),
    |t| t.to_designation,
  );
  let event = tx.insert(draft(&employee, from, promotion))?;
  sync_current(tx, &employee)?;
  Ok(event)
}

pub(crate) fn insert_in(
  tx: &mut dyn ChainTx,
  promotion: Promotion,
) -> Result<PromotionEvent> {
  let employee = active_employee(tx)?;
  known_designation(tx, &promotion.to_designation)?;
  let date = promotion.effective_date;
  after_hire(&employee, date)?;

  if tx.event_on(date)?.is_some() {
    return Err(Error::DateConflict {
      employee_id: employee.employee_id,
      date,
      reason: "an event already exists on this date".into(),
    });
  }

  let predecessor = tx.predecessor(date)?;
  let successor = tx.successor(date)?;

  let from = predecessor.map_or_else(
    || employee.initial_designation.clone(),
    |p| p.to_designation,
  );
  let event = tx.insert(draft(&employee, from, promotion))?;

  if let Some(next) = successor {
    relink(tx, next, &event.to_designation)?;
  }
  sync_current(tx, &employee)?;
  Ok(event)
}

pub(crate) fn update_in(
  tx: &mut dyn ChainTx,
  event_id: EventId,
  promotion: Promotion,
) -> Result<PromotionEvent> {
  let employee = active_employee(tx)?;
  known_designation(tx, &promotion.to_designation)?;
  let mut event = tx.event(event_id)?.ok_or(Error::EventNotFound(event_id))?;

  let predecessor = tx.predecessor(event.effective_date)?;
  let successor = tx.successor(event.effective_date)?;

  let date = promotion.effective_date;
  after_hire(&employee, date)?;
  if let Some(prev) = &predecessor
    && date <= prev.effective_date
  {
    return Err(Error::DateConflict {
      employee_id: employee.employee_id,
      date,
      reason: format!(
        "must stay after the preceding event {} on {}",
        prev.event_id, prev.effective_date
      ),
    });
  }
  if let Some(next) = &successor
    && date >= next.effective_date
  {
    return Err(Error::DateConflict {
      employee_id: employee.employee_id,
      date,
      reason: format!(
        "must stay before the following event {} on {}",
        next.event_id, next.effective_date
      ),
    });
  }

  event.to_designation = promotion.to_designation;
  event.effective_date = date;
  event.level = promotion.level;
  event.remarks = promotion.remarks;
  tx.rewrite(&event)?;

  if let Some(next) = successor {
    relink(tx, next, &event.to_designation)?;
  }
  sync_current(tx, &employee)?;
  Ok(event)
}

pub(crate) fn delete_in(
  tx: &mut dyn ChainTx,
  event_id: EventId,
) -> Result<PromotionEvent> {
  let employee = active_employee(tx)?;
  let event = tx.event(event_id)?.ok_or(Error::EventNotFound(event_id))?;

  let predecessor = tx.predecessor(event.effective_date)?;
  let successor = tx.successor(event.effective_date)?;

  tx.remove(event_id)?;

  if let Some(next) = successor {
    let from = predecessor.map_or_else(
      || employee.initial_designation.clone(),
      |p| p.to_designation,
    );
    relink(tx, next, &from)?;
  }
  sync_current(tx, &employee)?;
  Ok(event)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn active_employee(tx: &mut dyn ChainTx) -> Result<Employee> {
  let employee = tx.employee()?;
  if !employee.is_active() {
    return Err(Error::InactiveEmployee(employee.employee_id));
  }
  Ok(employee)
}

fn known_designation(tx: &mut dyn ChainTx, code: &Designation) -> Result<()> {
  if tx.designation_exists(code)? {
    Ok(())
  } else {
    Err(Error::UnknownDesignation(code.clone()))
  }
}

fn after_hire(employee: &Employee, date: NaiveDate) -> Result<()> {
  if date <= employee.hired_on {
    return Err(Error::InvalidSequence {
      employee_id: employee.employee_id,
      reason:      format!(
        "{date} is not after the hire date {}",
        employee.hired_on
      ),
    });
  }
  Ok(())
}

fn draft(employee: &Employee, from: Designation, p: Promotion) -> EventDraft {
  EventDraft {
    employee_id:      employee.employee_id,
    from_designation: from,
    to_designation:   p.to_designation,
    effective_date:   p.effective_date,
    level:            p.level,
    remarks:          p.remarks,
  }
}

/// Point `event.from_designation` at `from`, writing only if it changed.
fn relink(
  tx: &mut dyn ChainTx,
  mut event: PromotionEvent,
  from: &Designation,
) -> Result<()> {
  if &event.from_designation == from {
    return Ok(());
  }
  debug!(
    event_id = %event.event_id,
    old = %event.from_designation,
    new = %from,
    "relinking successor"
  );
  event.from_designation = from.clone();
  tx.rewrite(&event)
}

/// Refresh the cached current designation from the chain's tail.
fn sync_current(tx: &mut dyn ChainTx, employee: &Employee) -> Result<()> {
  let current = tx.tail()?.map_or_else(
    || employee.initial_designation.clone(),
    |t| t.to_designation,
  );
  if current != employee.current_designation {
    tx.set_current_designation(&current)?;
  }
  Ok(())
}

// ─── Verification ────────────────────────────────────────────────────────────

/// The first way in which a stored chain breaks its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ChainViolation {
  #[error("event {event_id} starts from {found}, expected {expected}")]
  BrokenLink {
    event_id: EventId,
    expected: Designation,
    found:    Designation,
  },

  #[error("event {event_id} on {date} does not follow {previous}")]
  DateNotIncreasing {
    event_id: EventId,
    date:     NaiveDate,
    previous: NaiveDate,
  },

  #[error("event {event_id} on {date} is not after hire date {hired_on}")]
  BeforeHire {
    event_id: EventId,
    date:     NaiveDate,
    hired_on: NaiveDate,
  },

  #[error("cached designation {cached} differs from chain tail {expected}")]
  StaleCurrentDesignation {
    expected: Designation,
    cached:   Designation,
  },
}

/// Check `events` (ordered by date, as returned by
/// [`ChainStore::history`]) against `employee`.
pub fn verify_chain(
  employee: &Employee,
  events: &[PromotionEvent],
) -> Result<(), ChainViolation> {
  let mut expected_from = &employee.initial_designation;
  let mut previous: Option<NaiveDate> = None;

  for event in events {
    if event.effective_date <= employee.hired_on {
      return Err(ChainViolation::BeforeHire {
        event_id: event.event_id,
        date:     event.effective_date,
        hired_on: employee.hired_on,
      });
    }
    if let Some(prev) = previous
      && event.effective_date <= prev
    {
      return Err(ChainViolation::DateNotIncreasing {
        event_id: event.event_id,
        date:     event.effective_date,
        previous: prev,
      });
    }
    if &event.from_designation != expected_from {
      return Err(ChainViolation::BrokenLink {
        event_id: event.event_id,
        expected: expected_from.clone(),
        found:    event.from_designation.clone(),
      });
    }
    expected_from = &event.to_designation;
    previous = Some(event.effective_date);
  }

  if &employee.current_designation != expected_from {
    return Err(ChainViolation::StaleCurrentDesignation {
      expected: expected_from.clone(),
      cached:   employee.current_designation.clone(),
    });
  }
  Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
