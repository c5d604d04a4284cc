//! Spreadsheet adapter for Tenure promotion imports.
//!
//! Converts serial dates and sheet rows (JSON or comma-separated) into
//! [`tenure_core::promotion::ProposedEvent`]s for the reconciler. Pure
//! synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use tenure_sheet::{into_proposals, parse_delimited};
//!
//! let text = "employee_id,designation,date,level\n100,KA,44713,1\n";
//! let proposals = into_proposals(parse_delimited(text).unwrap()).unwrap();
//! println!("{} proposed events", proposals.len());
//! ```

mod delimited;
pub mod error;
mod rows;
mod serial;

pub use delimited::parse_delimited;
pub use error::{Error, Result};
pub use rows::{MIN_TEXT_SERIAL, SheetDate, SheetRow, into_proposals, parse_json};
pub use serial::{date_to_serial, serial_to_date};
