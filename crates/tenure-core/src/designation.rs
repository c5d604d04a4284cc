//! Designations and the catalog that validates them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A catalog code for a job designation, e.g. `"PE"` or `"SPE"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Designation(pub String);

impl Designation {
  pub fn new(code: impl Into<String>) -> Self { Self(code.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Designation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for Designation {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for Designation {
  fn from(s: String) -> Self { Self(s) }
}

/// One row of the designation catalog. The catalog is used for validation
/// only; `rank` is informational and not consulted by the chain engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignationEntry {
  pub code:  Designation,
  pub title: String,
  #[serde(default)]
  pub rank:  i32,
}
