//! Spreadsheet serial dates in the 1900 date system.
//!
//! Serial 1 is 1900-01-01. The system treats 1900 as a leap year, so serial
//! 60 names a day that never existed and every serial from 61 on is one
//! higher than a plain day count would give.

use chrono::{Days, NaiveDate};

use crate::{Error, Result};

/// Serial of 9999-12-31, the last representable day.
const MAX_SERIAL: f64 = 2_958_465.0;

const PHANTOM_SERIAL: i64 = 60;

/// Day zero for serials above [`PHANTOM_SERIAL`].
fn epoch() -> Option<NaiveDate> { NaiveDate::from_ymd_opt(1899, 12, 30) }

fn march_1900() -> Option<NaiveDate> { NaiveDate::from_ymd_opt(1900, 3, 1) }

/// Convert a serial to a calendar date. Any fractional part is a time of day
/// and is dropped.
pub fn serial_to_date(serial: f64) -> Result<NaiveDate> {
  if !serial.is_finite() || serial < 1.0 || serial >= MAX_SERIAL + 1.0 {
    return Err(Error::SerialOutOfRange(serial));
  }

  let days = serial.trunc() as i64;
  let offset = match days {
    PHANTOM_SERIAL => return Err(Error::PhantomLeapDay),
    d if d < PHANTOM_SERIAL => d + 1,
    d => d,
  };

  epoch()
    .and_then(|e| e.checked_add_days(Days::new(offset as u64)))
    .ok_or(Error::SerialOutOfRange(serial))
}

/// Inverse of [`serial_to_date`]. Dates before 1900-01-01 yield serials
/// below 1, which [`serial_to_date`] rejects.
pub fn date_to_serial(date: NaiveDate) -> f64 {
  let (Some(epoch), Some(shift)) = (epoch(), march_1900()) else {
    return 0.0;
  };
  let days = (date - epoch).num_days();
  if date < shift { (days - 1) as f64 } else { days as f64 }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn known_serials() {
    assert_eq!(serial_to_date(1.0).unwrap(), date(1900, 1, 1));
    assert_eq!(serial_to_date(59.0).unwrap(), date(1900, 2, 28));
    assert_eq!(serial_to_date(61.0).unwrap(), date(1900, 3, 1));
    assert_eq!(serial_to_date(44927.0).unwrap(), date(2023, 1, 1));
    assert_eq!(serial_to_date(2_958_465.0).unwrap(), date(9999, 12, 31));
  }

  #[test]
  fn time_of_day_is_truncated() {
    assert_eq!(serial_to_date(44927.75).unwrap(), date(2023, 1, 1));
  }

  #[test]
  fn phantom_leap_day_is_rejected() {
    assert!(matches!(serial_to_date(60.0), Err(Error::PhantomLeapDay)));
    assert!(matches!(serial_to_date(60.5), Err(Error::PhantomLeapDay)));
  }

  #[test]
  fn out_of_range_serials_are_rejected() {
    for bad in [0.0, 0.99, -3.0, f64::NAN, 2_958_466.0] {
      assert!(
        matches!(serial_to_date(bad), Err(Error::SerialOutOfRange(_))),
        "{bad}"
      );
    }
  }

  #[test]
  fn date_to_serial_inverts() {
    for d in [date(1900, 1, 1), date(1900, 2, 28), date(1900, 3, 1), date(2022, 6, 1)] {
      assert_eq!(serial_to_date(date_to_serial(d)).unwrap(), d);
    }
    assert_eq!(date_to_serial(date(2023, 1, 1)), 44927.0);
  }
}
