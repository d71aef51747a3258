//! Effective check-in time.
//!
//! A check-in logged before a class starts is recorded at the start; one
//! logged after it ends is recorded at the end. Both boundaries are
//! inclusive, so an instant exactly at `start` or `end` is returned as is.

use chrono::{DateTime, Utc};

use crate::record::ClassSchedule;

/// Clamp `now` into `[start, end]`.
pub fn clamp(
  now: DateTime<Utc>,
  start: DateTime<Utc>,
  end: DateTime<Utc>,
) -> DateTime<Utc> {
  if now < start {
    start
  } else if now > end {
    end
  } else {
    now
  }
}

impl ClassSchedule {
  /// The effective time of a check-in made at `now` for this class.
  pub fn clamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    clamp(now, self.start, self.end)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 3, h, m, 0).unwrap()
  }

  fn window() -> ClassSchedule {
    ClassSchedule::new("cse-262", at(9, 0), at(9, 50)).unwrap()
  }

  #[test]
  fn early_check_in_moves_to_start() {
    assert_eq!(window().clamp(at(8, 55)), at(9, 0));
  }

  #[test]
  fn late_check_in_moves_to_end() {
    assert_eq!(window().clamp(at(10, 15)), at(9, 50));
  }

  #[test]
  fn in_window_is_untouched() {
    assert_eq!(window().clamp(at(9, 17)), at(9, 17));
  }

  #[test]
  fn boundaries_are_inclusive() {
    assert_eq!(window().clamp(at(9, 0)), at(9, 0));
    assert_eq!(window().clamp(at(9, 50)), at(9, 50));
  }

  #[test]
  fn sub_second_precision_is_kept() {
    let now = at(9, 10) + chrono::Duration::microseconds(1234);
    assert_eq!(window().clamp(now), now);
  }
}
