//! [`MemoryStore`] — an in-process [`ChainStore`].
//!
//! Each employee's chain sits behind its own async mutex, so transactions on
//! different employees run concurrently while transactions on the same
//! employee queue up (bounded by the lock timeout). A transaction works on a
//! private copy of the chain and swaps it in only when the closure succeeds.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  ops::Bound,
  sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
  },
  time::Duration,
};

use chrono::NaiveDate;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::{
  Error, Result,
  designation::{Designation, DesignationEntry},
  employee::{Employee, EmployeeId, EmployeeStatus, NewEmployee},
  promotion::{EventDraft, EventId, PromotionEvent},
  store::{ChainStore, ChainTx},
};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Chain {
  employee: Employee,
  events:   BTreeMap<NaiveDate, PromotionEvent>,
}

impl Chain {
  fn date_of(&self, event_id: EventId) -> Option<NaiveDate> {
    self
      .events
      .values()
      .find(|e| e.event_id == event_id)
      .map(|e| e.effective_date)
  }
}

#[derive(Debug)]
struct Inner {
  chains:        RwLock<BTreeMap<EmployeeId, Arc<Mutex<Chain>>>>,
  catalog:       RwLock<BTreeMap<Designation, DesignationEntry>>,
  /// Which employee owns each committed event.
  owners:        RwLock<HashMap<EventId, EmployeeId>>,
  next_event_id: AtomicI64,
  lock_timeout:  Duration,
}

/// An in-memory promotion-chain store.
///
/// Cloning is cheap; all state is reference-counted.
#[derive(Debug, Clone)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

impl Default for MemoryStore {
  fn default() -> Self { Self::new() }
}

impl MemoryStore {
  pub fn new() -> Self { Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT) }

  /// A store whose per-employee lock waits give up after `lock_timeout`.
  pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
    Self {
      inner: Arc::new(Inner {
        chains: RwLock::new(BTreeMap::new()),
        catalog: RwLock::new(BTreeMap::new()),
        owners: RwLock::new(HashMap::new()),
        next_event_id: AtomicI64::new(1),
        lock_timeout,
      }),
    }
  }

  async fn cell(&self, employee_id: EmployeeId) -> Option<Arc<Mutex<Chain>>> {
    self.inner.chains.read().await.get(&employee_id).cloned()
  }

  async fn lock<'a>(
    &self,
    employee_id: EmployeeId,
    cell: &'a Mutex<Chain>,
  ) -> Result<MutexGuard<'a, Chain>> {
    tokio::time::timeout(self.inner.lock_timeout, cell.lock())
      .await
      .map_err(|_| {
        Error::ConcurrentModification(format!(
          "timed out waiting for the chain lock of employee {employee_id}"
        ))
      })
  }
}

// ─── Transaction view ────────────────────────────────────────────────────────

struct MemoryTx<'a> {
  chain:   &'a mut Chain,
  catalog: &'a BTreeSet<Designation>,
  next_id: &'a AtomicI64,
}

impl MemoryTx<'_> {
  fn occupied(&self, date: NaiveDate, by_other_than: Option<EventId>) -> Result<()> {
    match self.chain.events.get(&date) {
      Some(e) if Some(e.event_id) != by_other_than => Err(Error::DateConflict {
        employee_id: self.chain.employee.employee_id,
        date,
        reason: format!("event {} already holds this date", e.event_id),
      }),
      _ => Ok(()),
    }
  }
}

impl ChainTx for MemoryTx<'_> {
  fn employee(&mut self) -> Result<Employee> { Ok(self.chain.employee.clone()) }

  fn designation_exists(&mut self, code: &Designation) -> Result<bool> {
    Ok(self.catalog.contains(code))
  }

  fn events(&mut self) -> Result<Vec<PromotionEvent>> {
    Ok(self.chain.events.values().cloned().collect())
  }

  fn event(&mut self, event_id: EventId) -> Result<Option<PromotionEvent>> {
    Ok(
      self
        .chain
        .date_of(event_id)
        .and_then(|d| self.chain.events.get(&d).cloned()),
    )
  }

  fn event_on(&mut self, date: NaiveDate) -> Result<Option<PromotionEvent>> {
    Ok(self.chain.events.get(&date).cloned())
  }

  fn predecessor(&mut self, date: NaiveDate) -> Result<Option<PromotionEvent>> {
    Ok(
      self
        .chain
        .events
        .range(..date)
        .next_back()
        .map(|(_, e)| e.clone()),
    )
  }

  fn successor(&mut self, date: NaiveDate) -> Result<Option<PromotionEvent>> {
    Ok(
      self
        .chain
        .events
        .range((Bound::Excluded(date), Bound::Unbounded))
        .next()
        .map(|(_, e)| e.clone()),
    )
  }

  fn tail(&mut self) -> Result<Option<PromotionEvent>> {
    Ok(self.chain.events.values().next_back().cloned())
  }

  fn insert(&mut self, draft: EventDraft) -> Result<PromotionEvent> {
    self.occupied(draft.effective_date, None)?;
    let id = EventId(self.next_id.fetch_add(1, Ordering::Relaxed));
    let event = draft.into_event(id);
    self.chain.events.insert(event.effective_date, event.clone());
    Ok(event)
  }

  fn rewrite(&mut self, event: &PromotionEvent) -> Result<()> {
    let old_date = self
      .chain
      .date_of(event.event_id)
      .ok_or(Error::EventNotFound(event.event_id))?;
    self.occupied(event.effective_date, Some(event.event_id))?;
    self.chain.events.remove(&old_date);
    self.chain.events.insert(event.effective_date, event.clone());
    Ok(())
  }

  fn remove(&mut self, event_id: EventId) -> Result<()> {
    let date = self
      .chain
      .date_of(event_id)
      .ok_or(Error::EventNotFound(event_id))?;
    self.chain.events.remove(&date);
    Ok(())
  }

  fn set_current_designation(&mut self, code: &Designation) -> Result<()> {
    self.chain.employee.current_designation = code.clone();
    Ok(())
  }
}

// ─── ChainStore impl ─────────────────────────────────────────────────────────

impl ChainStore for MemoryStore {
  async fn transact<T, F>(&self, employee_id: EmployeeId, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn ChainTx) -> Result<T> + Send + 'static,
  {
    let cell = self
      .cell(employee_id)
      .await
      .ok_or(Error::EmployeeNotFound(employee_id))?;
    let mut guard = self.lock(employee_id, &cell).await?;
    let catalog: BTreeSet<Designation> =
      self.inner.catalog.read().await.keys().cloned().collect();

    let mut working = (*guard).clone();
    let out = {
      let mut tx = MemoryTx {
        chain:   &mut working,
        catalog: &catalog,
        next_id: &self.inner.next_event_id,
      };
      work(&mut tx)?
    };

    let mut owners = self.inner.owners.write().await;
    for event in guard.events.values() {
      owners.remove(&event.event_id);
    }
    for event in working.events.values() {
      owners.insert(event.event_id, employee_id);
    }
    *guard = working;
    Ok(out)
  }

  async fn get_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>> {
    let Some(cell) = self.cell(employee_id).await else {
      return Ok(None);
    };
    let chain = self.lock(employee_id, &cell).await?;
    Ok(Some(chain.employee.clone()))
  }

  async fn list_employees(&self) -> Result<Vec<Employee>> {
    let cells: Vec<_> = self
      .inner
      .chains
      .read()
      .await
      .iter()
      .map(|(id, cell)| (*id, cell.clone()))
      .collect();

    let mut employees = Vec::with_capacity(cells.len());
    for (id, cell) in cells {
      employees.push(self.lock(id, &cell).await?.employee.clone());
    }
    Ok(employees)
  }

  async fn missing_employees(&self, ids: Vec<EmployeeId>) -> Result<Vec<EmployeeId>> {
    let chains = self.inner.chains.read().await;
    let missing: BTreeSet<_> =
      ids.into_iter().filter(|id| !chains.contains_key(id)).collect();
    Ok(missing.into_iter().collect())
  }

  async fn find_event(&self, event_id: EventId) -> Result<Option<PromotionEvent>> {
    let owner = self.inner.owners.read().await.get(&event_id).copied();
    let Some(employee_id) = owner else {
      return Ok(None);
    };
    let Some(cell) = self.cell(employee_id).await else {
      return Ok(None);
    };
    let chain = self.lock(employee_id, &cell).await?;
    Ok(
      chain
        .date_of(event_id)
        .and_then(|d| chain.events.get(&d).cloned()),
    )
  }

  async fn history(&self, employee_id: EmployeeId) -> Result<Vec<PromotionEvent>> {
    let cell = self
      .cell(employee_id)
      .await
      .ok_or(Error::EmployeeNotFound(employee_id))?;
    let chain = self.lock(employee_id, &cell).await?;
    Ok(chain.events.values().cloned().collect())
  }

  async fn snapshot(
    &self,
    employee_id: EmployeeId,
  ) -> Result<(Employee, Vec<PromotionEvent>)> {
    let cell = self
      .cell(employee_id)
      .await
      .ok_or(Error::EmployeeNotFound(employee_id))?;
    let chain = self.lock(employee_id, &cell).await?;
    Ok((
      chain.employee.clone(),
      chain.events.values().cloned().collect(),
    ))
  }

  async fn add_employee(&self, input: NewEmployee) -> Result<Employee> {
    let mut chains = self.inner.chains.write().await;
    if chains.contains_key(&input.employee_id) {
      return Err(Error::Duplicate(format!(
        "employee {} already exists",
        input.employee_id
      )));
    }
    let employee = input.into_employee();
    chains.insert(
      employee.employee_id,
      Arc::new(Mutex::new(Chain {
        employee: employee.clone(),
        events:   BTreeMap::new(),
      })),
    );
    Ok(employee)
  }

  async fn set_employee_status(
    &self,
    employee_id: EmployeeId,
    status: EmployeeStatus,
  ) -> Result<Employee> {
    let cell = self
      .cell(employee_id)
      .await
      .ok_or(Error::EmployeeNotFound(employee_id))?;
    let mut chain = self.lock(employee_id, &cell).await?;
    chain.employee.status = status;
    Ok(chain.employee.clone())
  }

  async fn add_designation(&self, entry: DesignationEntry) -> Result<DesignationEntry> {
    let mut catalog = self.inner.catalog.write().await;
    if catalog.contains_key(&entry.code) {
      return Err(Error::Duplicate(format!(
        "designation {} already exists",
        entry.code
      )));
    }
    catalog.insert(entry.code.clone(), entry.clone());
    Ok(entry)
  }

  async fn list_designations(&self) -> Result<Vec<DesignationEntry>> {
    let mut entries: Vec<_> =
      self.inner.catalog.read().await.values().cloned().collect();
    entries.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.code.cmp(&b.code)));
    Ok(entries)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Days;

  use super::*;
  use crate::{
    chain::{ChainEngine, verify_chain},
    promotion::Promotion,
    query::ChainQuery,
    test_support::{date, seeded_store},
  };

  #[tokio::test]
  async fn failed_transaction_leaves_chain_untouched() {
    let store = seeded_store().await;
    let emp = EmployeeId(100);

    let result: Result<()> = store
      .transact(emp, |tx| {
        let employee = tx.employee()?;
        tx.insert(EventDraft {
          employee_id:      employee.employee_id,
          from_designation: "PE".into(),
          to_designation:   "SPE".into(),
          effective_date:   date(2023, 1, 1),
          level:            1,
          remarks:          None,
        })?;
        tx.set_current_designation(&"SPE".into())?;
        Err(Error::ConcurrentModification("abort".into()))
      })
      .await;
    assert!(result.is_err());

    assert!(store.history(emp).await.unwrap().is_empty());
    let employee = store.get_employee(emp).await.unwrap().unwrap();
    assert_eq!(employee.current_designation, Designation::from("PE"));
  }

  #[tokio::test]
  async fn busy_employee_times_out_without_blocking_others() {
    let store = MemoryStore::with_lock_timeout(Duration::from_millis(50));
    for id in [1, 2] {
      store
        .add_employee(NewEmployee {
          employee_id:         EmployeeId(id),
          name:                format!("emp {id}"),
          initial_designation: "PE".into(),
          hired_on:            date(2020, 1, 1),
          status:              EmployeeStatus::Active,
        })
        .await
        .unwrap();
    }

    let cell = store.cell(EmployeeId(1)).await.unwrap();
    let _held = cell.lock().await;

    let err = store.history(EmployeeId(1)).await.unwrap_err();
    assert!(err.is_retryable());

    let other = store.transact(EmployeeId(2), |tx| tx.employee()).await;
    assert!(other.is_ok());
  }

  #[tokio::test]
  async fn missing_employees_are_sorted_and_deduplicated() {
    let store = seeded_store().await;
    let missing = store
      .missing_employees(vec![
        EmployeeId(9),
        EmployeeId(100),
        EmployeeId(3),
        EmployeeId(9),
      ])
      .await
      .unwrap();
    assert_eq!(missing, vec![EmployeeId(3), EmployeeId(9)]);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
  async fn concurrent_inserts_on_one_employee_are_serialised() {
    let store = seeded_store().await;
    let emp = EmployeeId(100);
    let codes = ["KA", "TL", "SPE", "PM"];
    let count = 48_u64;

    // Dates arrive out of order so most inserts relink a successor.
    let tasks: Vec<_> = (0..count)
      .map(|i| {
        let store = store.clone();
        let day = (i * 37) % count;
        let promotion = Promotion::new(
          codes[(i as usize) % codes.len()],
          date(2021, 1, 1) + Days::new(day * 7),
          1,
        );
        tokio::spawn(async move { ChainEngine::new(&store).insert_at(emp, promotion).await })
      })
      .collect();
    for task in tasks {
      task.await.unwrap().unwrap();
    }

    let history = ChainQuery::new(&store).history(emp).await.unwrap();
    assert_eq!(history.len(), count as usize);
    verify_chain(history.employee(), history.events()).unwrap();
    assert_eq!(
      history.employee().current_designation,
      history.events()[history.len() - 1].to_designation
    );
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn history_reads_employee_and_events_together() {
    let store = seeded_store().await;
    let emp = EmployeeId(100);

    let writer = {
      let store = store.clone();
      tokio::spawn(async move {
        let engine = ChainEngine::new(&store);
        for i in 0..40_u64 {
          let code = if i % 2 == 0 { "KA" } else { "TL" };
          engine
            .append(emp, Promotion::new(code, date(2021, 1, 1) + Days::new(i), 1))
            .await
            .unwrap();
        }
      })
    };

    let query = ChainQuery::new(&store);
    while !writer.is_finished() {
      let history = query.history(emp).await.unwrap();
      verify_chain(history.employee(), history.events()).unwrap();
      tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    assert_eq!(query.history(emp).await.unwrap().len(), 40);
  }
}
