//! [`SqliteStore`] — the SQLite implementation of [`ChainStore`].

use std::{collections::BTreeSet, path::Path, time::Duration};

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use tenure_core::{
  designation::{Designation, DesignationEntry},
  employee::{Employee, EmployeeId, EmployeeStatus, NewEmployee},
  promotion::{EventDraft, EventId, PromotionEvent},
  store::{ChainStore, ChainTx},
};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{
    EMPLOYEE_COLUMNS, EVENT_COLUMNS, RawEmployee, RawEvent, designation_from_row,
    encode_date, encode_status,
  },
  error::{classify, is_constraint},
  schema::SCHEMA,
};

/// How long a writer waits on a locked database before giving up with
/// [`tenure_core::Error::ConcurrentModification`].
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type CoreResult<T> = tenure_core::Result<T>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tenure promotion-chain store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
  }

  /// Like [`SqliteStore::open`], with an explicit lock wait.
  pub async fn open_with_timeout(
    path: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema(busy_timeout).await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema(DEFAULT_BUSY_TIMEOUT).await?;
    Ok(store)
  }

  async fn init_schema(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn load_employee(&self, employee_id: EmployeeId) -> Result<Option<Employee>> {
    let raw: Option<RawEmployee> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE employee_id = ?1"),
              params![employee_id.0],
              RawEmployee::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEmployee::into_employee).transpose()
  }

  async fn load_employees(&self) -> Result<Vec<Employee>> {
    let raws: Vec<RawEmployee> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY employee_id"
        ))?;
        let rows = stmt
          .query_map([], RawEmployee::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEmployee::into_employee).collect()
  }

  async fn load_event(&self, event_id: EventId) -> Result<Option<PromotionEvent>> {
    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EVENT_COLUMNS} FROM promotions WHERE event_id = ?1"),
              params![event_id.0],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn load_history(&self, employee_id: EmployeeId) -> Result<Vec<PromotionEvent>> {
    let raws: Option<Vec<RawEvent>> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM employees WHERE employee_id = ?1",
            params![employee_id.0],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM promotions
           WHERE employee_id = ?1
           ORDER BY effective_date"
        ))?;
        let rows = stmt
          .query_map(params![employee_id.0], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    raws
      .ok_or(tenure_core::Error::EmployeeNotFound(employee_id))?
      .into_iter()
      .map(RawEvent::into_event)
      .collect()
  }

  async fn load_snapshot(
    &self,
    employee_id: EmployeeId,
  ) -> Result<(Employee, Vec<PromotionEvent>)> {
    let raw: Option<(RawEmployee, Vec<RawEvent>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(employee) = tx
          .query_row(
            &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE employee_id = ?1"),
            params![employee_id.0],
            RawEmployee::from_row,
          )
          .optional()?
        else {
          return Ok(None);
        };

        let events = {
          let mut stmt = tx.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM promotions
             WHERE employee_id = ?1
             ORDER BY effective_date"
          ))?;
          let rows = stmt
            .query_map(params![employee_id.0], RawEvent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };
        tx.commit()?;
        Ok(Some((employee, events)))
      })
      .await?;

    let (employee, events) = raw.ok_or(tenure_core::Error::EmployeeNotFound(employee_id))?;
    Ok((
      employee.into_employee()?,
      events
        .into_iter()
        .map(RawEvent::into_event)
        .collect::<Result<Vec<_>>>()?,
    ))
  }

  async fn absent_employees(&self, ids: Vec<EmployeeId>) -> Result<Vec<EmployeeId>> {
    let wanted: BTreeSet<EmployeeId> = ids.into_iter().collect();
    let missing = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare("SELECT 1 FROM employees WHERE employee_id = ?1")?;
        let mut missing = Vec::new();
        for id in wanted {
          if !stmt.exists(params![id.0])? {
            missing.push(id);
          }
        }
        Ok(missing)
      })
      .await?;
    Ok(missing)
  }

  async fn insert_employee(&self, input: NewEmployee) -> Result<Employee> {
    let employee = input.into_employee();
    let row = employee.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO employees (
             employee_id, name, initial_designation, current_designation,
             hired_on, status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            row.employee_id.0,
            row.name,
            row.initial_designation.as_str(),
            row.current_designation.as_str(),
            encode_date(row.hired_on),
            encode_status(row.status),
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_constraint(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(
        tenure_core::Error::Duplicate(format!(
          "employee {} already exists",
          employee.employee_id
        ))
        .into(),
      );
    }
    Ok(employee)
  }

  async fn update_status(
    &self,
    employee_id: EmployeeId,
    status: EmployeeStatus,
  ) -> Result<Employee> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE employees SET status = ?1 WHERE employee_id = ?2",
          params![encode_status(status), employee_id.0],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(tenure_core::Error::EmployeeNotFound(employee_id).into());
    }
    self
      .load_employee(employee_id)
      .await?
      .ok_or_else(|| tenure_core::Error::EmployeeNotFound(employee_id).into())
  }

  async fn insert_designation(&self, entry: DesignationEntry) -> Result<DesignationEntry> {
    let row = entry.clone();
    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO designations (code, title, rank) VALUES (?1, ?2, ?3)",
          params![row.code.as_str(), row.title, row.rank],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_constraint(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(
        tenure_core::Error::Duplicate(format!("designation {} already exists", entry.code))
          .into(),
      );
    }
    Ok(entry)
  }

  async fn load_designations(&self) -> Result<Vec<DesignationEntry>> {
    let entries = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT code, title, rank FROM designations ORDER BY rank, code")?;
        let rows = stmt
          .query_map([], designation_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(entries)
  }
}

// ─── Transaction view ────────────────────────────────────────────────────────

/// [`ChainTx`] over an open `BEGIN IMMEDIATE` transaction.
struct SqliteTx<'a> {
  conn:        &'a Connection,
  employee_id: EmployeeId,
}

impl SqliteTx<'_> {
  /// Fetch at most one event for the scoped employee; `clause` follows
  /// `WHERE employee_id = ?1` and may bind `?2`.
  fn one(&self, clause: &str, arg: impl rusqlite::ToSql) -> CoreResult<Option<PromotionEvent>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM promotions WHERE employee_id = ?1 {clause}"),
        params![self.employee_id.0, arg],
        RawEvent::from_row,
      )
      .optional()
      .map_err(classify)?;
    Ok(raw.map(RawEvent::into_event).transpose()?)
  }

  fn date_conflict(&self, date: NaiveDate) -> tenure_core::Error {
    tenure_core::Error::DateConflict {
      employee_id: self.employee_id,
      date,
      reason: "another event already holds this date".into(),
    }
  }
}

impl ChainTx for SqliteTx<'_> {
  fn employee(&mut self) -> CoreResult<Employee> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE employee_id = ?1"),
        params![self.employee_id.0],
        RawEmployee::from_row,
      )
      .optional()
      .map_err(classify)?
      .ok_or(tenure_core::Error::EmployeeNotFound(self.employee_id))?;
    Ok(raw.into_employee()?)
  }

  fn designation_exists(&mut self, code: &Designation) -> CoreResult<bool> {
    self
      .conn
      .prepare_cached("SELECT 1 FROM designations WHERE code = ?1")
      .and_then(|mut stmt| stmt.exists(params![code.as_str()]))
      .map_err(classify)
  }

  fn events(&mut self) -> CoreResult<Vec<PromotionEvent>> {
    let employee_id = self.employee_id.0;
    let raws = self
      .conn
      .prepare_cached(&format!(
        "SELECT {EVENT_COLUMNS} FROM promotions
         WHERE employee_id = ?1
         ORDER BY effective_date"
      ))
      .and_then(|mut stmt| {
        let rows = stmt
          .query_map(params![employee_id], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .map_err(classify)?;
    Ok(
      raws
        .into_iter()
        .map(RawEvent::into_event)
        .collect::<Result<Vec<_>>>()?,
    )
  }

  fn event(&mut self, event_id: EventId) -> CoreResult<Option<PromotionEvent>> {
    self.one("AND event_id = ?2", event_id.0)
  }

  fn event_on(&mut self, date: NaiveDate) -> CoreResult<Option<PromotionEvent>> {
    self.one("AND effective_date = ?2", encode_date(date))
  }

  fn predecessor(&mut self, date: NaiveDate) -> CoreResult<Option<PromotionEvent>> {
    self.one(
      "AND effective_date < ?2 ORDER BY effective_date DESC LIMIT 1",
      encode_date(date),
    )
  }

  fn successor(&mut self, date: NaiveDate) -> CoreResult<Option<PromotionEvent>> {
    self.one(
      "AND effective_date > ?2 ORDER BY effective_date ASC LIMIT 1",
      encode_date(date),
    )
  }

  fn tail(&mut self) -> CoreResult<Option<PromotionEvent>> {
    let raw = self
      .conn
      .query_row(
        &format!(
          "SELECT {EVENT_COLUMNS} FROM promotions
           WHERE employee_id = ?1
           ORDER BY effective_date DESC LIMIT 1"
        ),
        params![self.employee_id.0],
        RawEvent::from_row,
      )
      .optional()
      .map_err(classify)?;
    Ok(raw.map(RawEvent::into_event).transpose()?)
  }

  fn insert(&mut self, draft: EventDraft) -> CoreResult<PromotionEvent> {
    let result = self.conn.execute(
      "INSERT INTO promotions (
         employee_id, from_designation, to_designation, effective_date, level, remarks
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        draft.employee_id.0,
        draft.from_designation.as_str(),
        draft.to_designation.as_str(),
        encode_date(draft.effective_date),
        draft.level,
        draft.remarks,
      ],
    );
    match result {
      Ok(_) => {}
      Err(e) if is_constraint(&e) => return Err(self.date_conflict(draft.effective_date)),
      Err(e) => return Err(classify(e)),
    }
    let event_id = EventId(self.conn.last_insert_rowid());
    debug!(event_id = %event_id, employee_id = %draft.employee_id, "inserted promotion row");
    Ok(draft.into_event(event_id))
  }

  fn rewrite(&mut self, event: &PromotionEvent) -> CoreResult<()> {
    let result = self.conn.execute(
      "UPDATE promotions
       SET from_designation = ?1, to_designation = ?2, effective_date = ?3,
           level = ?4, remarks = ?5
       WHERE event_id = ?6 AND employee_id = ?7",
      params![
        event.from_designation.as_str(),
        event.to_designation.as_str(),
        encode_date(event.effective_date),
        event.level,
        event.remarks,
        event.event_id.0,
        self.employee_id.0,
      ],
    );
    match result {
      Ok(0) => Err(tenure_core::Error::EventNotFound(event.event_id)),
      Ok(_) => Ok(()),
      Err(e) if is_constraint(&e) => Err(self.date_conflict(event.effective_date)),
      Err(e) => Err(classify(e)),
    }
  }

  fn remove(&mut self, event_id: EventId) -> CoreResult<()> {
    let removed = self
      .conn
      .execute(
        "DELETE FROM promotions WHERE event_id = ?1 AND employee_id = ?2",
        params![event_id.0, self.employee_id.0],
      )
      .map_err(classify)?;
    if removed == 0 {
      return Err(tenure_core::Error::EventNotFound(event_id));
    }
    Ok(())
  }

  fn set_current_designation(&mut self, code: &Designation) -> CoreResult<()> {
    self
      .conn
      .execute(
        "UPDATE employees SET current_designation = ?1 WHERE employee_id = ?2",
        params![code.as_str(), self.employee_id.0],
      )
      .map_err(classify)?;
    Ok(())
  }
}

// ─── ChainStore impl ─────────────────────────────────────────────────────────

impl ChainStore for SqliteStore {
  async fn transact<T, F>(&self, employee_id: EmployeeId, work: F) -> CoreResult<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn ChainTx) -> CoreResult<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = {
          let mut scope = SqliteTx { conn: &tx, employee_id };
          work(&mut scope)
        };
        match result {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          // Dropping `tx` rolls back.
          Err(e) => Ok(Err(e)),
        }
      })
      .await
      .map_err(Error::from)?;
    outcome
  }

  async fn get_employee(&self, employee_id: EmployeeId) -> CoreResult<Option<Employee>> {
    Ok(self.load_employee(employee_id).await?)
  }

  async fn list_employees(&self) -> CoreResult<Vec<Employee>> {
    Ok(self.load_employees().await?)
  }

  async fn missing_employees(&self, ids: Vec<EmployeeId>) -> CoreResult<Vec<EmployeeId>> {
    Ok(self.absent_employees(ids).await?)
  }

  async fn find_event(&self, event_id: EventId) -> CoreResult<Option<PromotionEvent>> {
    Ok(self.load_event(event_id).await?)
  }

  async fn history(&self, employee_id: EmployeeId) -> CoreResult<Vec<PromotionEvent>> {
    Ok(self.load_history(employee_id).await?)
  }

  async fn snapshot(
    &self,
    employee_id: EmployeeId,
  ) -> CoreResult<(Employee, Vec<PromotionEvent>)> {
    Ok(self.load_snapshot(employee_id).await?)
  }

  async fn add_employee(&self, input: NewEmployee) -> CoreResult<Employee> {
    Ok(self.insert_employee(input).await?)
  }

  async fn set_employee_status(
    &self,
    employee_id: EmployeeId,
    status: EmployeeStatus,
  ) -> CoreResult<Employee> {
    Ok(self.update_status(employee_id, status).await?)
  }

  async fn add_designation(&self, entry: DesignationEntry) -> CoreResult<DesignationEntry> {
    Ok(self.insert_designation(entry).await?)
  }

  async fn list_designations(&self) -> CoreResult<Vec<DesignationEntry>> {
    Ok(self.load_designations().await?)
  }
}
