//! Read-only projections over a [`ChainStore`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  chain::{ChainViolation, verify_chain},
  designation::Designation,
  employee::{Employee, EmployeeId},
  promotion::PromotionEvent,
  store::ChainStore,
};

// ─── History ─────────────────────────────────────────────────────────────────

/// A snapshot of one employee's chain, ordered by `effective_date`
/// ascending.
///
/// Iteration is lazy and can be restarted any number of times; nothing is
/// read from the store after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
  employee: Employee,
  events:   Vec<PromotionEvent>,
}

impl History {
  pub fn employee(&self) -> &Employee { &self.employee }

  pub fn events(&self) -> &[PromotionEvent] { &self.events }

  pub fn iter(&self) -> std::slice::Iter<'_, PromotionEvent> { self.events.iter() }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  /// The designation held on `date`: the target of the latest event not
  /// after `date`, or the initial designation if there is none.
  pub fn designation_on(&self, date: NaiveDate) -> &Designation {
    let held = self.events.partition_point(|e| e.effective_date <= date);
    match held {
      0 => &self.employee.initial_designation,
      n => &self.events[n - 1].to_designation,
    }
  }

  pub fn into_events(self) -> Vec<PromotionEvent> { self.events }
}

impl<'a> IntoIterator for &'a History {
  type IntoIter = std::slice::Iter<'a, PromotionEvent>;
  type Item = &'a PromotionEvent;

  fn into_iter(self) -> Self::IntoIter { self.iter() }
}

// ─── Verification report ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
  pub employee_id: EmployeeId,
  pub events:      usize,
  pub consistent:  bool,
  pub violation:   Option<ChainViolation>,
}

// ─── Facade ──────────────────────────────────────────────────────────────────

pub struct ChainQuery<'s, S> {
  store: &'s S,
}

impl<'s, S: ChainStore> ChainQuery<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// The cached current designation maintained by the chain engine.
  pub async fn current_designation(&self, employee_id: EmployeeId) -> Result<Designation> {
    Ok(self.employee(employee_id).await?.current_designation)
  }

  /// The employee and its events as of one instant.
  pub async fn history(&self, employee_id: EmployeeId) -> Result<History> {
    let (employee, events) = self.store.snapshot(employee_id).await?;
    Ok(History { employee, events })
  }

  /// Walk the stored chain and report the first invariant violation, if any.
  pub async fn verify(&self, employee_id: EmployeeId) -> Result<ChainReport> {
    let history = self.history(employee_id).await?;
    let violation = verify_chain(&history.employee, &history.events).err();
    Ok(ChainReport {
      employee_id,
      events: history.len(),
      consistent: violation.is_none(),
      violation,
    })
  }

  async fn employee(&self, employee_id: EmployeeId) -> Result<Employee> {
    self
      .store
      .get_employee(employee_id)
      .await?
      .ok_or(Error::EmployeeNotFound(employee_id))
  }
}
