//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use tenure_core::{
  Error,
  chain::ChainEngine,
  designation::{Designation, DesignationEntry},
  employee::{EmployeeId, EmployeeStatus, NewEmployee},
  promotion::{EventId, Promotion, ProposedEvent},
  query::ChainQuery,
  reconcile::Reconciler,
  store::ChainStore,
};

use crate::SqliteStore;

const ALICE: EmployeeId = EmployeeId(100);
const BOB: EmployeeId = EmployeeId(200);

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn hire(id: EmployeeId, initial: &str) -> NewEmployee {
  NewEmployee {
    employee_id:         id,
    name:                format!("Employee {id}"),
    initial_designation: initial.into(),
    hired_on:            date(2020, 1, 1),
    status:              EmployeeStatus::Active,
  }
}

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store with the standard catalog and two `PE` employees.
async fn seeded() -> SqliteStore {
  let s = store().await;
  for (rank, code) in ["PE", "KA", "TL", "SPE", "PM"].into_iter().enumerate() {
    s.add_designation(DesignationEntry {
      code:  code.into(),
      title: code.to_lowercase(),
      rank:  rank as i32,
    })
    .await
    .unwrap();
  }
  s.add_employee(hire(ALICE, "PE")).await.unwrap();
  s.add_employee(hire(BOB, "PE")).await.unwrap();
  s
}

fn codes(events: &[tenure_core::promotion::PromotionEvent]) -> Vec<(&str, &str)> {
  events
    .iter()
    .map(|e| (e.from_designation.as_str(), e.to_designation.as_str()))
    .collect()
}

// ─── Catalog and employees ───────────────────────────────────────────────────

#[tokio::test]
async fn designations_list_in_rank_order() {
  let s = seeded().await;
  let listed: Vec<_> = s
    .list_designations()
    .await
    .unwrap()
    .into_iter()
    .map(|d| d.code.0)
    .collect();
  assert_eq!(listed, vec!["PE", "KA", "TL", "SPE", "PM"]);
}

#[tokio::test]
async fn duplicate_designation_is_rejected() {
  let s = seeded().await;
  let err = s
    .add_designation(DesignationEntry {
      code:  "PE".into(),
      title: "again".into(),
      rank:  9,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Duplicate(_)));
}

#[tokio::test]
async fn duplicate_employee_is_rejected() {
  let s = seeded().await;
  let err = s.add_employee(hire(ALICE, "KA")).await.unwrap_err();
  assert!(matches!(err, Error::Duplicate(_)));
}

#[tokio::test]
async fn new_employee_starts_on_initial_designation() {
  let s = seeded().await;
  let alice = s.get_employee(ALICE).await.unwrap().unwrap();
  assert_eq!(alice.current_designation, Designation::from("PE"));
  assert_eq!(alice.hired_on, date(2020, 1, 1));
  assert!(alice.is_active());

  assert!(s.get_employee(EmployeeId(404)).await.unwrap().is_none());
  assert_eq!(s.list_employees().await.unwrap().len(), 2);
}

#[tokio::test]
async fn status_change_persists() {
  let s = seeded().await;
  let updated = s
    .set_employee_status(ALICE, EmployeeStatus::Inactive)
    .await
    .unwrap();
  assert!(!updated.is_active());

  let err = s
    .set_employee_status(EmployeeId(404), EmployeeStatus::Active)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmployeeNotFound(EmployeeId(404))));
}

#[tokio::test]
async fn missing_employees_are_sorted_and_unique() {
  let s = seeded().await;
  let missing = s
    .missing_employees(vec![EmployeeId(9), ALICE, EmployeeId(3), EmployeeId(9)])
    .await
    .unwrap();
  assert_eq!(missing, vec![EmployeeId(3), EmployeeId(9)]);
}

#[tokio::test]
async fn history_of_unknown_employee_is_not_found() {
  let s = seeded().await;
  assert!(matches!(
    s.history(EmployeeId(404)).await,
    Err(Error::EmployeeNotFound(_))
  ));
  assert!(s.history(ALICE).await.unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_pairs_employee_with_its_events() {
  let s = seeded().await;
  ChainEngine::new(&s)
    .append(ALICE, Promotion::new("KA", date(2022, 6, 1), 1))
    .await
    .unwrap();

  let (employee, events) = s.snapshot(ALICE).await.unwrap();
  assert_eq!(employee.current_designation, Designation::from("KA"));
  assert_eq!(codes(&events), vec![("PE", "KA")]);

  assert!(matches!(
    s.snapshot(EmployeeId(404)).await,
    Err(Error::EmployeeNotFound(EmployeeId(404)))
  ));
}

// ─── Chain engine ────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_insert_delete_keeps_chain_linked() {
  let s = seeded().await;
  let engine = ChainEngine::new(&s);

  engine
    .append(ALICE, Promotion::new("SPE", date(2023, 1, 1), 2))
    .await
    .unwrap();
  let ka = engine
    .insert_at(ALICE, Promotion::new("KA", date(2022, 6, 1), 1))
    .await
    .unwrap();

  let events = s.history(ALICE).await.unwrap();
  assert_eq!(codes(&events), vec![("PE", "KA"), ("KA", "SPE")]);
  assert_eq!(
    s.get_employee(ALICE).await.unwrap().unwrap().current_designation,
    Designation::from("SPE")
  );

  let removed = engine.delete(ka.event_id).await.unwrap();
  assert_eq!(removed.event_id, ka.event_id);
  let events = s.history(ALICE).await.unwrap();
  assert_eq!(codes(&events), vec![("PE", "SPE")]);

  let report = ChainQuery::new(&s).verify(ALICE).await.unwrap();
  assert!(report.consistent, "{report:?}");
}

#[tokio::test]
async fn deleting_only_event_reverts_to_initial() {
  let s = seeded().await;
  let engine = ChainEngine::new(&s);
  let only = engine
    .append(ALICE, Promotion::new("KA", date(2021, 3, 1), 1))
    .await
    .unwrap();

  engine.delete(only.event_id).await.unwrap();
  assert!(s.history(ALICE).await.unwrap().is_empty());
  assert_eq!(
    ChainQuery::new(&s).current_designation(ALICE).await.unwrap(),
    Designation::from("PE")
  );
}

#[tokio::test]
async fn append_before_tail_is_rejected_without_writing() {
  let s = seeded().await;
  let engine = ChainEngine::new(&s);
  engine
    .append(ALICE, Promotion::new("KA", date(2022, 6, 1), 1))
    .await
    .unwrap();

  let err = engine
    .append(ALICE, Promotion::new("TL", date(2022, 1, 1), 2))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidSequence { .. }));
  assert_eq!(s.history(ALICE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn insert_on_occupied_date_conflicts() {
  let s = seeded().await;
  let engine = ChainEngine::new(&s);
  engine
    .append(ALICE, Promotion::new("KA", date(2022, 6, 1), 1))
    .await
    .unwrap();

  let err = engine
    .insert_at(ALICE, Promotion::new("TL", date(2022, 6, 1), 2))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DateConflict { .. }));
}

#[tokio::test]
async fn update_relinks_successor() {
  let s = seeded().await;
  let engine = ChainEngine::new(&s);
  let ka = engine
    .append(ALICE, Promotion::new("KA", date(2022, 6, 1), 1))
    .await
    .unwrap();
  engine
    .append(ALICE, Promotion::new("SPE", date(2023, 1, 1), 2))
    .await
    .unwrap();

  let updated = engine
    .update(
      ka.event_id,
      Promotion::new("TL", date(2022, 7, 1), 1).with_remarks("corrected"),
    )
    .await
    .unwrap();
  assert_eq!(updated.remarks.as_deref(), Some("corrected"));

  let events = s.history(ALICE).await.unwrap();
  assert_eq!(codes(&events), vec![("PE", "TL"), ("TL", "SPE")]);
  assert_eq!(events[0].effective_date, date(2022, 7, 1));
}

#[tokio::test]
async fn find_event_and_missing_event() {
  let s = seeded().await;
  let engine = ChainEngine::new(&s);
  let ka = engine
    .append(BOB, Promotion::new("KA", date(2022, 6, 1), 1))
    .await
    .unwrap();

  let found = s.find_event(ka.event_id).await.unwrap().unwrap();
  assert_eq!(found.employee_id, BOB);
  assert!(s.find_event(EventId(9999)).await.unwrap().is_none());

  assert!(matches!(
    engine.delete(EventId(9999)).await,
    Err(Error::EventNotFound(EventId(9999)))
  ));
}

#[tokio::test]
async fn inactive_employee_cannot_be_promoted() {
  let s = seeded().await;
  s.set_employee_status(BOB, EmployeeStatus::Inactive)
    .await
    .unwrap();
  let err = ChainEngine::new(&s)
    .append(BOB, Promotion::new("KA", date(2022, 6, 1), 1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InactiveEmployee(_)));
}

#[tokio::test]
async fn failed_transaction_leaves_no_trace() {
  let s = seeded().await;
  let err = s
    .transact(ALICE, |tx| {
      let employee = tx.employee()?;
      tx.set_current_designation(&Designation::from("PM"))?;
      Err::<(), _>(Error::InvalidSequence {
        employee_id: employee.employee_id,
        reason:      "abort".into(),
      })
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidSequence { .. }));
  assert_eq!(
    s.get_employee(ALICE).await.unwrap().unwrap().current_designation,
    Designation::from("PE")
  );
}

// ─── Bulk reconciliation ─────────────────────────────────────────────────────

fn row(employee_id: EmployeeId, to: &str, on: NaiveDate, level: i32) -> ProposedEvent {
  ProposedEvent {
    employee_id,
    promotion: Promotion::new(to, on, level),
  }
}

#[tokio::test]
async fn bulk_import_isolates_failing_employee() {
  let s = seeded().await;
  let report = Reconciler::new(&s)
    .reconcile(vec![
      row(ALICE, "SPE", date(2023, 1, 1), 2),
      row(BOB, "KA", date(2022, 3, 1), 1),
      row(ALICE, "KA", date(2022, 6, 1), 1),
      row(BOB, "TL", date(2022, 3, 1), 2),
      row(ALICE, "PM", date(2024, 2, 1), 3),
    ])
    .await
    .unwrap();

  assert_eq!(report.successful.len(), 3);
  assert!(report.successful.iter().all(|a| a.employee_id == ALICE));
  assert_eq!(report.failed.len(), 1);
  assert_eq!(report.failed[0].employee_id, BOB);

  let alice = s.history(ALICE).await.unwrap();
  assert_eq!(
    codes(&alice),
    vec![("PE", "KA"), ("KA", "SPE"), ("SPE", "PM")]
  );
  assert!(s.history(BOB).await.unwrap().is_empty());
  assert_eq!(
    s.get_employee(ALICE).await.unwrap().unwrap().current_designation,
    Designation::from("PM")
  );
}

#[tokio::test]
async fn bulk_import_with_unknown_employee_writes_nothing() {
  let s = seeded().await;
  let err = Reconciler::new(&s)
    .reconcile(vec![
      row(ALICE, "KA", date(2022, 6, 1), 1),
      row(EmployeeId(777), "KA", date(2022, 6, 1), 1),
    ])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownEmployees(ref ids) if ids == &[EmployeeId(777)]));
  assert!(s.history(ALICE).await.unwrap().is_empty());
}
