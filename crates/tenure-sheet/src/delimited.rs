//! Header-driven comma-separated promotion sheets.
//!
//! The first non-blank line names the columns. `employee_id`, `designation`
//! and `date` are required; `level` and `remarks` are optional. Header names
//! are matched case-insensitively and may appear in any order. A leading
//! byte-order mark is ignored. When `remarks` is the last column, cells
//! beyond the header's width are unquoted commas inside remarks and are
//! joined back onto it; any other overlong row is rejected.

use tenure_core::employee::EmployeeId;

use crate::{Error, Result, rows::{SheetDate, SheetRow}};

struct Columns {
  employee_id: usize,
  designation: usize,
  date:        usize,
  level:       Option<usize>,
  remarks:     Option<usize>,
  width:       usize,
}

impl Columns {
  fn from_header(cells: &[String]) -> Result<Self> {
    let find = |name: &str| {
      cells
        .iter()
        .position(|c| c.trim().eq_ignore_ascii_case(name))
    };
    Ok(Self {
      employee_id: find("employee_id").ok_or(Error::MissingColumn("employee_id"))?,
      designation: find("designation").ok_or(Error::MissingColumn("designation"))?,
      date:        find("date").ok_or(Error::MissingColumn("date"))?,
      level:       find("level"),
      remarks:     find("remarks"),
      width:       cells.len(),
    })
  }
}

/// Parse delimited text into sheet rows. Row numbers in errors are 1-based
/// line numbers, counting the header.
pub fn parse_delimited(text: &str) -> Result<Vec<SheetRow>> {
  let text = text.strip_prefix('\u{feff}').unwrap_or(text);
  let mut lines = text
    .lines()
    .enumerate()
    .filter(|(_, l)| !l.trim().is_empty());

  let Some((_, header)) = lines.next() else {
    return Ok(Vec::new());
  };
  let columns = Columns::from_header(&split_line(header))?;

  lines
    .map(|(i, line)| parse_row(&columns, split_line(line), i + 1))
    .collect()
}

fn parse_row(columns: &Columns, mut cells: Vec<String>, line: usize) -> Result<SheetRow> {
  if cells.len() > columns.width {
    if columns.remarks != Some(columns.width - 1) {
      return Err(Error::row(
        line,
        format!("{} cells for {} columns", cells.len(), columns.width),
      ));
    }
    let overflow = cells.split_off(columns.width);
    if let Some(cell) = cells.last_mut() {
      for extra in overflow {
        cell.push(',');
        cell.push_str(&extra);
      }
    }
  }

  let cell = |idx: usize| cells.get(idx).map(|c| c.trim()).unwrap_or("");

  let employee_id = cell(columns.employee_id)
    .parse::<i64>()
    .map_err(|_| {
      Error::row(line, format!("invalid employee_id {:?}", cell(columns.employee_id)))
    })?;

  let designation = cell(columns.designation);
  if designation.is_empty() {
    return Err(Error::row(line, "designation is empty"));
  }

  let level = match columns.level.map(cell) {
    None | Some("") => 0,
    Some(raw) => raw
      .parse::<i32>()
      .map_err(|_| Error::row(line, format!("invalid level {raw:?}")))?,
  };

  let remarks = columns
    .remarks
    .map(cell)
    .filter(|r| !r.is_empty())
    .map(str::to_owned);

  Ok(SheetRow {
    employee_id: EmployeeId(employee_id),
    designation: designation.into(),
    date: SheetDate::Text(cell(columns.date).to_owned()),
    level,
    remarks,
  })
}

/// Split one line on commas, honouring double-quoted cells with `""`
/// escapes.
fn split_line(line: &str) -> Vec<String> {
  let mut cells = Vec::new();
  let mut current = String::new();
  let mut quoted = false;
  let mut chars = line.chars().peekable();

  while let Some(c) = chars.next() {
    match c {
      '"' if quoted && chars.peek() == Some(&'"') => {
        current.push('"');
        chars.next();
      }
      '"' => quoted = !quoted,
      ',' if !quoted => cells.push(std::mem::take(&mut current)),
      _ => current.push(c),
    }
  }
  cells.push(current);
  cells
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::rows::into_proposals;

  #[test]
  fn columns_in_any_order_and_case() {
    let text = "Date,EMPLOYEE_ID,Designation,Level\n\
                2022-06-01,100,KA,1\n\
                \n\
                44927,100,SPE,2\n";
    let rows = parse_delimited(text).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].employee_id, EmployeeId(100));
    assert_eq!(rows[1].level, 2);

    let proposals = into_proposals(rows).unwrap();
    assert_eq!(
      proposals[1].promotion.effective_date,
      NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    );
  }

  #[test]
  fn overflow_cells_join_into_remarks() {
    let text = "employee_id,designation,date,level,remarks\n\
                7,TL,2023-04-01,2,promoted early, see memo\n\
                8,TL,2023-04-01,2,\"quoted, remark\"\n";
    let rows = parse_delimited(text).unwrap();
    assert_eq!(rows[0].remarks.as_deref(), Some("promoted early, see memo"));
    assert_eq!(rows[1].remarks.as_deref(), Some("quoted, remark"));
  }

  #[test]
  fn overflow_before_other_columns_is_rejected() {
    let text = "employee_id,remarks,designation,date\n\
                1,early, see memo,KA,2022-06-01\n";
    assert!(matches!(
      parse_delimited(text),
      Err(Error::InvalidRow { row: 2, .. })
    ));

    let quoted = "employee_id,remarks,designation,date\n\
                  1,\"early, see memo\",KA,2022-06-01\n";
    let rows = parse_delimited(quoted).unwrap();
    assert_eq!(rows[0].designation.as_str(), "KA");
    assert_eq!(rows[0].remarks.as_deref(), Some("early, see memo"));
  }

  #[test]
  fn byte_order_mark_is_ignored() {
    let rows =
      parse_delimited("\u{feff}employee_id,designation,date\n1,KA,2022-06-01\n").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].employee_id, EmployeeId(1));
  }

  #[test]
  fn optional_columns_default() {
    let rows = parse_delimited("employee_id,designation,date\n5,PM,2024-02-01\n").unwrap();
    assert_eq!(rows[0].level, 0);
    assert!(rows[0].remarks.is_none());
  }

  #[test]
  fn missing_required_column() {
    assert!(matches!(
      parse_delimited("employee_id,date\n1,2024-01-01\n"),
      Err(Error::MissingColumn("designation"))
    ));
  }

  #[test]
  fn bad_cell_reports_line() {
    let err = parse_delimited("employee_id,designation,date\n1,KA,2024-01-01\nx,KA,2024-01-02\n")
      .unwrap_err();
    assert!(matches!(err, Error::InvalidRow { row: 3, .. }), "{err}");
  }
}
