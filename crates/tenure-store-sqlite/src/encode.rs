//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as ISO 8601 `YYYY-MM-DD` strings so that lexical order
//! equals chronological order. Identifiers are stored as SQLite integers.

use std::str::FromStr as _;

use chrono::NaiveDate;
use tenure_core::{
  designation::{Designation, DesignationEntry},
  employee::{Employee, EmployeeId, EmployeeStatus},
  promotion::{EventId, PromotionEvent},
};

use crate::{Error, Result};

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── EmployeeStatus ──────────────────────────────────────────────────────────

pub fn encode_status(s: EmployeeStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<EmployeeStatus> {
  EmployeeStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "event_id, employee_id, from_designation, \
                                 to_designation, effective_date, level, remarks";

/// Raw values read directly from a `promotions` row.
pub struct RawEvent {
  pub event_id:         i64,
  pub employee_id:      i64,
  pub from_designation: String,
  pub to_designation:   String,
  pub effective_date:   String,
  pub level:            i32,
  pub remarks:          Option<String>,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:         row.get(0)?,
      employee_id:      row.get(1)?,
      from_designation: row.get(2)?,
      to_designation:   row.get(3)?,
      effective_date:   row.get(4)?,
      level:            row.get(5)?,
      remarks:          row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<PromotionEvent> {
    Ok(PromotionEvent {
      event_id:         EventId(self.event_id),
      employee_id:      EmployeeId(self.employee_id),
      from_designation: Designation(self.from_designation),
      to_designation:   Designation(self.to_designation),
      effective_date:   decode_date(&self.effective_date)?,
      level:            self.level,
      remarks:          self.remarks,
    })
  }
}

/// Column list matching [`RawEmployee::from_row`].
pub const EMPLOYEE_COLUMNS: &str = "employee_id, name, initial_designation, \
                                    current_designation, hired_on, status";

/// Raw values read directly from an `employees` row.
pub struct RawEmployee {
  pub employee_id:         i64,
  pub name:                String,
  pub initial_designation: String,
  pub current_designation: String,
  pub hired_on:            String,
  pub status:              String,
}

impl RawEmployee {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      employee_id:         row.get(0)?,
      name:                row.get(1)?,
      initial_designation: row.get(2)?,
      current_designation: row.get(3)?,
      hired_on:            row.get(4)?,
      status:              row.get(5)?,
    })
  }

  pub fn into_employee(self) -> Result<Employee> {
    Ok(Employee {
      employee_id:         EmployeeId(self.employee_id),
      name:                self.name,
      initial_designation: Designation(self.initial_designation),
      current_designation: Designation(self.current_designation),
      hired_on:            decode_date(&self.hired_on)?,
      status:              decode_status(&self.status)?,
    })
  }
}

pub fn designation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DesignationEntry> {
  Ok(DesignationEntry {
    code:  Designation(row.get(0)?),
    title: row.get(1)?,
    rank:  row.get(2)?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_sort_lexically() {
    let earlier = encode_date(NaiveDate::from_ymd_opt(2022, 6, 1).unwrap());
    let later = encode_date(NaiveDate::from_ymd_opt(2022, 10, 1).unwrap());
    assert_eq!(earlier, "2022-06-01");
    assert!(earlier < later);
    assert_eq!(
      decode_date(&later).unwrap(),
      NaiveDate::from_ymd_opt(2022, 10, 1).unwrap()
    );
  }

  #[test]
  fn unknown_status_is_rejected() {
    assert_eq!(decode_status("inactive").unwrap(), EmployeeStatus::Inactive);
    assert!(matches!(decode_status("retired"), Err(Error::UnknownStatus(_))));
  }
}
