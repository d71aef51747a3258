//! Per-user attendance counters and the deltas that maintain them.
//!
//! Counters are a materialised view over check-in statuses. They are never
//! written directly; every change arrives as a [`CounterUpdate`], which a
//! store applies atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::{Counter, Status};

// ─── UserCounters ────────────────────────────────────────────────────────────

/// Aggregate attendance outcomes for one user. Counts are never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounters {
  pub email:         String,
  pub present:       i64,
  pub excused:       i64,
  pub dishonest:     i64,
  /// Effective time of the most recent `Present` check-in, if any.
  pub last_attended: Option<DateTime<Utc>>,
}

impl UserCounters {
  /// The record a user has before any check-in touched it.
  pub fn empty(email: impl Into<String>) -> Self {
    Self {
      email:         email.into(),
      present:       0,
      excused:       0,
      dishonest:     0,
      last_attended: None,
    }
  }

  pub fn total(&self) -> i64 { self.present + self.excused + self.dishonest }

  /// Apply an update in memory, with the same flooring at zero that stores
  /// use.
  pub fn apply(&mut self, update: &CounterUpdate) {
    self.present = (self.present + update.delta.present).max(0);
    self.excused = (self.excused + update.delta.excused).max(0);
    self.dishonest = (self.dishonest + update.delta.dishonest).max(0);
    match update.last_attended {
      LastAttended::Unchanged => {}
      LastAttended::Set(at) => self.last_attended = Some(at),
      LastAttended::Clear => self.last_attended = None,
    }
  }
}

// ─── CounterDelta ────────────────────────────────────────────────────────────

/// Signed additive change to each counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
  pub present:   i64,
  pub excused:   i64,
  pub dishonest: i64,
}

impl CounterDelta {
  /// Schedule `+1` on the counter `status` feeds. No-op for uncounted
  /// statuses.
  pub fn increment(&mut self, status: Status) { self.add(status, 1); }

  /// Schedule `-1` on the counter `status` feeds. No-op for uncounted
  /// statuses.
  pub fn decrement(&mut self, status: Status) { self.add(status, -1); }

  fn add(&mut self, status: Status, n: i64) {
    match status.counter() {
      Some(Counter::Present) => self.present += n,
      Some(Counter::Excused) => self.excused += n,
      Some(Counter::Dishonest) => self.dishonest += n,
      None => {}
    }
  }

  pub fn is_zero(&self) -> bool {
    self.present == 0 && self.excused == 0 && self.dishonest == 0
  }
}

// ─── LastAttended ────────────────────────────────────────────────────────────

/// What an update does to `last_attended`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "at", rename_all = "snake_case")]
pub enum LastAttended {
  #[default]
  Unchanged,
  Set(DateTime<Utc>),
  Clear,
}

// ─── CounterUpdate ───────────────────────────────────────────────────────────

/// One atomic write against a user's counter record.
///
/// Stores apply the delta, the `last_attended` change and the triggering
/// check-in's `effective_at` together or not at all, and apply a given
/// `event_key` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterUpdate {
  pub email:         String,
  pub event_key:     String,
  /// The check-in whose write fired the trigger.
  pub checkin_id:    Uuid,
  pub delta:         CounterDelta,
  pub last_attended: LastAttended,
  /// Clamped attendance time to persist on `checkin_id`, if the check-in
  /// just became `Present`.
  #[serde(default)]
  pub effective_at:  Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn uncounted_statuses_leave_delta_empty() {
    let mut d = CounterDelta::default();
    d.increment(Status::Absent);
    d.decrement(Status::Unset);
    assert!(d.is_zero());
  }

  #[test]
  fn transition_between_real_statuses_nets_zero() {
    let mut d = CounterDelta::default();
    d.decrement(Status::Excused);
    d.increment(Status::Dishonest);
    assert_eq!(d.excused, -1);
    assert_eq!(d.dishonest, 1);
    assert_eq!(d.present, 0);
    assert_eq!(d.present + d.excused + d.dishonest, 0);
  }

  #[test]
  fn apply_floors_at_zero_and_handles_last_attended() {
    let at = Utc.with_ymd_and_hms(2024, 9, 3, 9, 0, 0).unwrap();
    let mut c = UserCounters::empty("a@miamioh.edu");

    let mut delta = CounterDelta::default();
    delta.increment(Status::Present);
    c.apply(&CounterUpdate {
      email: c.email.clone(),
      event_key: "k:0".into(),
      checkin_id: Uuid::nil(),
      delta,
      last_attended: LastAttended::Set(at),
      effective_at: Some(at),
    });
    assert_eq!(c.present, 1);
    assert_eq!(c.last_attended, Some(at));

    let mut delta = CounterDelta::default();
    delta.decrement(Status::Excused);
    c.apply(&CounterUpdate {
      email: c.email.clone(),
      event_key: "k:1".into(),
      checkin_id: Uuid::nil(),
      delta,
      last_attended: LastAttended::Unchanged,
      effective_at: None,
    });
    assert_eq!(c.excused, 0);
    assert_eq!(c.last_attended, Some(at));

    c.apply(&CounterUpdate {
      email: c.email.clone(),
      event_key: "k:2".into(),
      checkin_id: Uuid::nil(),
      delta: CounterDelta::default(),
      last_attended: LastAttended::Clear,
      effective_at: None,
    });
    assert_eq!(c.last_attended, None);
    assert_eq!(c.total(), 1);
  }
}
