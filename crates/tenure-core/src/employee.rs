//! Employee — the owner of a promotion chain.
//!
//! Employees belong to the HR subsystem. The chain core reads them and keeps
//! exactly one field up to date: the cached `current_designation`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::designation::Designation;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EmployeeId(pub i64);

impl fmt::Display for EmployeeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
  #[default]
  Active,
  Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
  pub employee_id:         EmployeeId,
  pub name:                String,
  /// Fixed at hire; never changes.
  pub initial_designation: Designation,
  /// Derived cache: the `to_designation` of the chain's tail, or
  /// `initial_designation` when the chain is empty.
  pub current_designation: Designation,
  pub hired_on:            NaiveDate,
  pub status:              EmployeeStatus,
}

impl Employee {
  pub fn is_active(&self) -> bool { self.status == EmployeeStatus::Active }
}

/// Input to [`crate::store::ChainStore::add_employee`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmployee {
  pub employee_id:         EmployeeId,
  pub name:                String,
  pub initial_designation: Designation,
  pub hired_on:            NaiveDate,
  #[serde(default)]
  pub status:              EmployeeStatus,
}

impl NewEmployee {
  /// The employee as it looks on the day it is created: an empty chain, so
  /// the current designation is the initial one.
  pub fn into_employee(self) -> Employee {
    Employee {
      employee_id:         self.employee_id,
      name:                self.name,
      current_designation: self.initial_designation.clone(),
      initial_designation: self.initial_designation,
      hired_on:            self.hired_on,
      status:              self.status,
    }
  }
}
