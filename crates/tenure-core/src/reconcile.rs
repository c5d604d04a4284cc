//! Bulk reconciliation of externally supplied promotion events.
//!
//! A batch may span many employees. Unknown employee ids abort the whole
//! batch before anything is written. After that, each employee's group is
//! applied in its own transaction: one employee's bad rows roll back only
//! that employee's changes, and the rest of the batch carries on.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  chain::{append_in, insert_in},
  employee::EmployeeId,
  error::ErrorKind,
  promotion::{EventId, Promotion, PromotionEvent, ProposedEvent},
  store::{ChainStore, ChainTx},
};

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEvent {
  pub employee_id:    EmployeeId,
  pub event_id:       EventId,
  pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEmployee {
  pub employee_id: EmployeeId,
  pub kind:        ErrorKind,
  pub message:     String,
  /// `true` when the failure was lock contention and resubmitting this
  /// employee's rows may succeed.
  pub retryable:   bool,
}

impl FailedEmployee {
  fn new(employee_id: EmployeeId, error: &Error) -> Self {
    Self {
      employee_id,
      kind: error.kind(),
      message: error.to_string(),
      retryable: error.is_retryable(),
    }
  }
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
  pub batch_id:   Uuid,
  pub successful: Vec<AppliedEvent>,
  pub failed:     Vec<FailedEmployee>,
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

pub struct Reconciler<'s, S> {
  store: &'s S,
}

impl<'s, S: ChainStore> Reconciler<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Apply `batch` with per-employee atomicity.
  ///
  /// Returns `Err(Error::UnknownEmployees)` without writing anything if the
  /// batch names an employee the store does not know. Every other failure is
  /// confined to its employee and reported in [`ReconcileReport::failed`].
  pub async fn reconcile(&self, batch: Vec<ProposedEvent>) -> Result<ReconcileReport> {
    let batch_id = Uuid::new_v4();

    let mut groups: BTreeMap<EmployeeId, Vec<Promotion>> = BTreeMap::new();
    for proposed in batch {
      groups
        .entry(proposed.employee_id)
        .or_default()
        .push(proposed.promotion);
    }

    let missing = self
      .store
      .missing_employees(groups.keys().copied().collect())
      .await?;
    if !missing.is_empty() {
      warn!(%batch_id, ?missing, "rejecting batch with unknown employees");
      return Err(Error::UnknownEmployees(missing));
    }

    let mut report = ReconcileReport {
      batch_id,
      successful: Vec::new(),
      failed: Vec::new(),
    };

    for (employee_id, mut group) in groups {
      group.sort_by_key(|p| p.effective_date);
      let rows = group.len();

      match self
        .store
        .transact(employee_id, move |tx| thread_group(tx, group))
        .await
      {
        Ok(events) => {
          report
            .successful
            .extend(events.into_iter().map(|e| AppliedEvent {
              employee_id,
              event_id: e.event_id,
              effective_date: e.effective_date,
            }));
        }
        Err(e) => {
          warn!(%batch_id, %employee_id, rows, error = %e, "employee group rolled back");
          report.failed.push(FailedEmployee::new(employee_id, &e));
        }
      }
    }

    info!(
      %batch_id,
      applied = report.successful.len(),
      failed_employees = report.failed.len(),
      "reconciled promotion batch"
    );
    Ok(report)
  }
}

/// Thread a date-sorted group onto the employee's chain.
///
/// Rows after the current tail behave exactly like successive appends; a row
/// dated before the tail is spliced in with insert semantics, relinking its
/// successor.
fn thread_group(
  tx: &mut dyn ChainTx,
  group: Vec<Promotion>,
) -> Result<Vec<PromotionEvent>> {
  let mut applied = Vec::with_capacity(group.len());
  for promotion in group {
    let tail_date = tx.tail()?.map(|t| t.effective_date);
    let event = match tail_date {
      Some(d) if promotion.effective_date <= d => insert_in(tx, promotion)?,
      _ => append_in(tx, promotion)?,
    };
    applied.push(event);
  }
  Ok(applied)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    chain::{ChainEngine, verify_chain},
    designation::Designation,
    memory::MemoryStore,
    test_support::{date, seeded_store},
  };

  const A: EmployeeId = EmployeeId(100);
  const B: EmployeeId = EmployeeId(200);

  fn row(employee: EmployeeId, to: &str, d: NaiveDate) -> ProposedEvent {
    ProposedEvent {
      employee_id: employee,
      promotion:   Promotion::new(to, d, 1),
    }
  }

  async fn assert_consistent(store: &MemoryStore, id: EmployeeId) {
    let employee = store.get_employee(id).await.unwrap().unwrap();
    let events = store.history(id).await.unwrap();
    verify_chain(&employee, &events).unwrap();
  }

  #[tokio::test]
  async fn bad_employee_group_does_not_block_others() {
    let store = seeded_store().await;
    ChainEngine::new(&store)
      .append(B, Promotion::new("SPE", date(2022, 5, 1), 2))
      .await
      .unwrap();
    let b_before = store.history(B).await.unwrap();

    let batch = vec![
      row(A, "PM", date(2024, 1, 1)),
      row(B, "KA", date(2022, 5, 1)),
      row(A, "KA", date(2022, 1, 1)),
      row(A, "SPE", date(2023, 1, 1)),
    ];
    let report = Reconciler::new(&store).reconcile(batch).await.unwrap();

    assert_eq!(report.successful.len(), 3);
    assert!(report.successful.iter().all(|a| a.employee_id == A));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].employee_id, B);
    assert_eq!(report.failed[0].kind, ErrorKind::DateConflict);
    assert!(!report.failed[0].retryable);

    let a_chain = store.history(A).await.unwrap();
    let links: Vec<_> = a_chain
      .iter()
      .map(|e| (e.from_designation.as_str(), e.to_designation.as_str()))
      .collect();
    assert_eq!(links, vec![("PE", "KA"), ("KA", "SPE"), ("SPE", "PM")]);
    assert_consistent(&store, A).await;

    assert_eq!(store.history(B).await.unwrap(), b_before);
  }

  #[tokio::test]
  async fn unknown_employee_aborts_whole_batch() {
    let store = seeded_store().await;
    let batch = vec![
      row(A, "SPE", date(2023, 1, 1)),
      row(EmployeeId(555), "SPE", date(2023, 1, 1)),
    ];

    let err = Reconciler::new(&store).reconcile(batch).await.unwrap_err();
    assert!(matches!(err, Error::UnknownEmployees(ref ids) if ids == &[EmployeeId(555)]));
    assert!(store.history(A).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn group_threads_onto_existing_tail() {
    let store = seeded_store().await;
    ChainEngine::new(&store)
      .append(A, Promotion::new("KA", date(2021, 1, 1), 1))
      .await
      .unwrap();

    let report = Reconciler::new(&store)
      .reconcile(vec![
        row(A, "PM", date(2023, 1, 1)),
        row(A, "SPE", date(2022, 1, 1)),
      ])
      .await
      .unwrap();
    assert!(report.failed.is_empty());

    let chain = store.history(A).await.unwrap();
    assert_eq!(chain[1].from_designation, Designation::from("KA"));
    assert_eq!(chain[2].from_designation, Designation::from("SPE"));
    let employee = store.get_employee(A).await.unwrap().unwrap();
    assert_eq!(employee.current_designation, Designation::from("PM"));
  }

  #[tokio::test]
  async fn rows_before_tail_are_spliced_in() {
    let store = seeded_store().await;
    ChainEngine::new(&store)
      .append(A, Promotion::new("SPE", date(2023, 1, 1), 2))
      .await
      .unwrap();

    let report = Reconciler::new(&store)
      .reconcile(vec![row(A, "KA", date(2022, 6, 1))])
      .await
      .unwrap();
    assert_eq!(report.successful.len(), 1);

    let chain = store.history(A).await.unwrap();
    assert_eq!(chain[1].from_designation, Designation::from("KA"));
    assert_consistent(&store, A).await;
  }

  #[tokio::test]
  async fn duplicate_dates_within_a_group_roll_back_the_group() {
    let store = seeded_store().await;
    let report = Reconciler::new(&store)
      .reconcile(vec![
        row(A, "KA", date(2022, 1, 1)),
        row(A, "SPE", date(2022, 1, 1)),
      ])
      .await
      .unwrap();

    assert!(report.successful.is_empty());
    assert_eq!(report.failed[0].kind, ErrorKind::DateConflict);
    assert!(store.history(A).await.unwrap().is_empty());
    let employee = store.get_employee(A).await.unwrap().unwrap();
    assert_eq!(employee.current_designation, Designation::from("PE"));
  }
}
