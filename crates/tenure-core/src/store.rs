//! The `ChainStore` and `ChainTx` traits.
//!
//! Storage backends (the in-memory [`crate::memory::MemoryStore`],
//! `tenure-store-sqlite`) implement these. The chain engine, the reconciler
//! and the query facade depend only on this abstraction.
//!
//! Stores are pure storage: they enforce no chain invariants. All invariant
//! logic runs inside a [`ChainStore::transact`] closure, against the
//! employee-scoped [`ChainTx`] view.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  Result,
  designation::{Designation, DesignationEntry},
  employee::{Employee, EmployeeId, EmployeeStatus, NewEmployee},
  promotion::{EventDraft, EventId, PromotionEvent},
};

// ─── Transaction view ────────────────────────────────────────────────────────

/// Synchronous read/write access to one employee's row set inside an open
/// transaction.
///
/// Reads observe the transaction's own earlier writes. Every method is scoped
/// to the employee the transaction was opened for; events belonging to other
/// employees are invisible.
pub trait ChainTx {
  /// The scoped employee. Fails with
  /// [`Error::EmployeeNotFound`](crate::Error::EmployeeNotFound) if absent.
  fn employee(&mut self) -> Result<Employee>;

  /// Whether `code` is present in the designation catalog.
  fn designation_exists(&mut self, code: &Designation) -> Result<bool>;

  /// All events, ordered by `effective_date` ascending.
  fn events(&mut self) -> Result<Vec<PromotionEvent>>;

  fn event(&mut self, event_id: EventId) -> Result<Option<PromotionEvent>>;

  /// The event dated exactly `date`, if any.
  fn event_on(&mut self, date: NaiveDate) -> Result<Option<PromotionEvent>>;

  /// The latest event dated strictly before `date`.
  fn predecessor(&mut self, date: NaiveDate) -> Result<Option<PromotionEvent>>;

  /// The earliest event dated strictly after `date`.
  fn successor(&mut self, date: NaiveDate) -> Result<Option<PromotionEvent>>;

  /// The latest event.
  fn tail(&mut self) -> Result<Option<PromotionEvent>>;

  /// Persist a new event; the store assigns its id.
  fn insert(&mut self, draft: EventDraft) -> Result<PromotionEvent>;

  /// Overwrite every mutable column of an existing event.
  fn rewrite(&mut self, event: &PromotionEvent) -> Result<()>;

  fn remove(&mut self, event_id: EventId) -> Result<()>;

  /// Update the employee's cached current designation.
  fn set_current_designation(&mut self, code: &Designation) -> Result<()>;
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable promotion-chain backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ChainStore: Send + Sync {
  // ── Transactions ──────────────────────────────────────────────────────

  /// Run `work` inside one atomic transaction scoped to `employee_id`.
  ///
  /// The transaction commits if `work` returns `Ok` and rolls back otherwise;
  /// partial writes are never visible. Transactions on the same employee are
  /// serialised. A lock that cannot be acquired within the store's timeout
  /// yields [`Error::ConcurrentModification`](crate::Error::ConcurrentModification).
  fn transact<T, F>(
    &self,
    employee_id: EmployeeId,
    work: F,
  ) -> impl Future<Output = Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn ChainTx) -> Result<T> + Send + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_employee(
    &self,
    employee_id: EmployeeId,
  ) -> impl Future<Output = Result<Option<Employee>>> + Send + '_;

  fn list_employees(&self) -> impl Future<Output = Result<Vec<Employee>>> + Send + '_;

  /// The subset of `ids` with no employee row, in ascending order.
  fn missing_employees(
    &self,
    ids: Vec<EmployeeId>,
  ) -> impl Future<Output = Result<Vec<EmployeeId>>> + Send + '_;

  /// Look up a single event regardless of employee.
  fn find_event(
    &self,
    event_id: EventId,
  ) -> impl Future<Output = Result<Option<PromotionEvent>>> + Send + '_;

  /// All events for an employee, ordered by `effective_date` ascending.
  fn history(
    &self,
    employee_id: EmployeeId,
  ) -> impl Future<Output = Result<Vec<PromotionEvent>>> + Send + '_;

  /// The employee row and its events, read together so the cached current
  /// designation agrees with the chain. Fails with
  /// [`Error::EmployeeNotFound`](crate::Error::EmployeeNotFound) if absent.
  fn snapshot(
    &self,
    employee_id: EmployeeId,
  ) -> impl Future<Output = Result<(Employee, Vec<PromotionEvent>)>> + Send + '_;

  // ── HR and catalog collaborators ──────────────────────────────────────

  fn add_employee(
    &self,
    input: NewEmployee,
  ) -> impl Future<Output = Result<Employee>> + Send + '_;

  fn set_employee_status(
    &self,
    employee_id: EmployeeId,
    status: EmployeeStatus,
  ) -> impl Future<Output = Result<Employee>> + Send + '_;

  fn add_designation(
    &self,
    entry: DesignationEntry,
  ) -> impl Future<Output = Result<DesignationEntry>> + Send + '_;

  fn list_designations(
    &self,
  ) -> impl Future<Output = Result<Vec<DesignationEntry>>> + Send + '_;
}
