//! Plain-text rendering of API responses for the terminal.

use std::fmt::Write as _;

use tenure_core::{
  promotion::PromotionEvent,
  query::{ChainReport, History},
  reconcile::ReconcileReport,
};

use crate::client::DesignationAnswer;

pub fn event_line(e: &PromotionEvent) -> String {
  let mut line = format!(
    "#{:<6} {}  {} → {}  (level {})",
    e.event_id.0, e.effective_date, e.from_designation, e.to_designation, e.level
  );
  if let Some(remarks) = &e.remarks {
    let _ = write!(line, "  {remarks}");
  }
  line
}

pub fn history(h: &History) -> String {
  let employee = h.employee();
  let mut out = format!(
    "{} {} ({}, hired {}, started as {})\n",
    employee.employee_id,
    employee.name,
    employee.status,
    employee.hired_on,
    employee.initial_designation,
  );
  if h.is_empty() {
    out.push_str("  no promotions recorded\n");
  }
  for event in h {
    let _ = writeln!(out, "  {}", event_line(event));
  }
  let _ = writeln!(out, "current: {}", employee.current_designation);
  out
}

pub fn designation(a: &DesignationAnswer) -> String {
  match a.on {
    Some(date) => format!("{} (on {date})", a.designation),
    None => a.designation.to_string(),
  }
}

pub fn chain_report(r: &ChainReport) -> String {
  match &r.violation {
    None => format!("employee {}: {} events, chain consistent", r.employee_id, r.events),
    Some(v) => format!("employee {}: {} events, BROKEN: {v}", r.employee_id, r.events),
  }
}

pub fn import_report(r: &ReconcileReport) -> String {
  let mut out = format!(
    "batch {}: {} applied, {} employees failed\n",
    r.batch_id,
    r.successful.len(),
    r.failed.len()
  );
  for f in &r.failed {
    let retry = if f.retryable { " (retryable)" } else { "" };
    let _ = writeln!(out, "  employee {}: {}{retry}", f.employee_id, f.message);
  }
  out
}
