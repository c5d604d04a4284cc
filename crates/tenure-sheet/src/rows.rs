//! Sheet rows and their conversion into reconciler input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tenure_core::{
  designation::Designation,
  employee::EmployeeId,
  promotion::{Promotion, ProposedEvent},
};

use crate::{Error, Result, serial::serial_to_date};

/// A date cell as it arrives from a sheet: either a serial number or an ISO
/// `YYYY-MM-DD` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetDate {
  Serial(f64),
  Text(String),
}

/// 1927-05-18. Numeric text below this reads as a year or a typo, not a
/// date.
pub const MIN_TEXT_SERIAL: f64 = 10_000.0;

impl SheetDate {
  /// Resolve to a calendar date. Text that parses as a number of at least
  /// [`MIN_TEXT_SERIAL`] is treated as a serial, so delimited exports of
  /// serial columns work unchanged. Smaller numbers in text, such as a bare
  /// year, are rejected.
  pub fn resolve(&self) -> Result<NaiveDate> {
    match self {
      Self::Serial(n) => serial_to_date(*n),
      Self::Text(s) => {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
          return Ok(date);
        }
        match s.parse::<f64>() {
          Ok(n) if n >= MIN_TEXT_SERIAL => serial_to_date(n),
          _ => Err(Error::InvalidDate(s.to_owned())),
        }
      }
    }
  }
}

impl From<NaiveDate> for SheetDate {
  fn from(d: NaiveDate) -> Self { Self::Text(d.format("%Y-%m-%d").to_string()) }
}

/// One row of a promotion sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
  pub employee_id: EmployeeId,
  pub designation: Designation,
  pub date:        SheetDate,
  #[serde(default)]
  pub level:       i32,
  #[serde(default)]
  pub remarks:     Option<String>,
}

impl SheetRow {
  fn into_proposal(self) -> Result<ProposedEvent> {
    let code = self.designation.as_str().trim();
    if code.is_empty() {
      return Err(Error::InvalidRow {
        row:    0,
        reason: "designation is empty".into(),
      });
    }
    let promotion = Promotion {
      to_designation: Designation::new(code),
      effective_date: self.date.resolve()?,
      level:          self.level,
      remarks:        self.remarks.filter(|r| !r.trim().is_empty()),
    };
    Ok(ProposedEvent {
      employee_id: self.employee_id,
      promotion,
    })
  }
}

/// Convert sheet rows into reconciler input. The first bad row aborts the
/// conversion; its error carries the 1-based row number.
pub fn into_proposals(rows: Vec<SheetRow>) -> Result<Vec<ProposedEvent>> {
  rows
    .into_iter()
    .enumerate()
    .map(|(i, row)| {
      row.into_proposal().map_err(|e| match e {
        Error::InvalidRow { reason, .. } => Error::row(i + 1, reason),
        other => Error::row(i + 1, other),
      })
    })
    .collect()
}

/// Parse a JSON array of [`SheetRow`]s.
pub fn parse_json(text: &str) -> Result<Vec<SheetRow>> { Ok(serde_json::from_str(text)?) }

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn json_rows_accept_serial_and_iso_dates() {
    let rows = parse_json(
      r#"[
        {"employee_id": 100, "designation": "KA", "date": 44713, "level": 1},
        {"employee_id": 100, "designation": "SPE", "date": "2023-01-01", "level": 2,
         "remarks": "annual review"}
      ]"#,
    )
    .unwrap();
    assert_eq!(rows[0].date, SheetDate::Serial(44713.0));

    let proposals = into_proposals(rows).unwrap();
    assert_eq!(proposals[0].promotion.effective_date, date(2022, 6, 1));
    assert_eq!(proposals[1].promotion.effective_date, date(2023, 1, 1));
    assert_eq!(
      proposals[1].promotion.remarks.as_deref(),
      Some("annual review")
    );
  }

  #[test]
  fn numeric_text_is_a_serial() {
    assert_eq!(
      SheetDate::Text("44927".into()).resolve().unwrap(),
      date(2023, 1, 1)
    );
    assert!(matches!(
      SheetDate::Text("next tuesday".into()).resolve(),
      Err(Error::InvalidDate(_))
    ));
  }

  #[test]
  fn short_numeric_text_is_not_a_date() {
    for cell in ["2023", "7", "9999.5"] {
      assert!(
        matches!(SheetDate::Text(cell.into()).resolve(), Err(Error::InvalidDate(_))),
        "{cell}"
      );
    }
    assert_eq!(SheetDate::Serial(2023.0).resolve().unwrap(), date(1905, 7, 15));
  }

  #[test]
  fn bad_row_reports_its_number() {
    let rows = vec![
      SheetRow {
        employee_id: EmployeeId(1),
        designation: "KA".into(),
        date:        SheetDate::Serial(44713.0),
        level:       1,
        remarks:     None,
      },
      SheetRow {
        employee_id: EmployeeId(1),
        designation: "TL".into(),
        date:        SheetDate::Serial(60.0),
        level:       2,
        remarks:     None,
      },
    ];
    match into_proposals(rows) {
      Err(Error::InvalidRow { row, reason }) => {
        assert_eq!(row, 2);
        assert!(reason.contains("1900-02-29"), "{reason}");
      }
      other => panic!("expected InvalidRow, got {other:?}"),
    }
  }

  #[test]
  fn blank_designation_is_rejected() {
    let rows = vec![SheetRow {
      employee_id: EmployeeId(1),
      designation: "  ".into(),
      date:        SheetDate::Serial(44713.0),
      level:       0,
      remarks:     None,
    }];
    assert!(matches!(
      into_proposals(rows),
      Err(Error::InvalidRow { row: 1, .. })
    ));
  }
}
