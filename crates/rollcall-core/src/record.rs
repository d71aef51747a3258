//! Documents owned by the attendance store: accounts, class schedules and
//! check-ins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, status::Status};

// ─── Account ─────────────────────────────────────────────────────────────────

/// A user account admitted by the [`AccessGate`](crate::gate::AccessGate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub email:        String,
  pub display_name: Option<String>,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`AttendanceStore::create_account`](crate::store::AttendanceStore::create_account).
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:        String,
  pub display_name: Option<String>,
}

// ─── ClassSchedule ───────────────────────────────────────────────────────────

/// The scheduled window of one class session. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSchedule {
  pub class_id: String,
  pub start:    DateTime<Utc>,
  pub end:      DateTime<Utc>,
}

impl ClassSchedule {
  /// Build a schedule, rejecting windows that end before they start.
  pub fn new(
    class_id: impl Into<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Self> {
    let class_id = class_id.into();
    if start > end {
      return Err(Error::InvalidSchedule { class_id, start, end });
    }
    Ok(Self { class_id, start, end })
  }
}

// ─── CheckIn ─────────────────────────────────────────────────────────────────

/// A student's attendance record for one class session.
///
/// `version` starts at 0 and is bumped by the store on every status write.
/// Together with `checkin_id` it identifies one delivery of a trigger.
///
/// `effective_at` is the clamped attendance time, written by the reconciler
/// in the same transaction as the counter update whenever the check-in
/// becomes `Present`. It stays `None` until then, or when the class has no
/// schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
  pub checkin_id:   Uuid,
  pub email:        String,
  pub class_id:     String,
  pub section:      String,
  #[serde(default)]
  pub status:       Status,
  pub timestamp:    DateTime<Utc>,
  #[serde(default)]
  pub effective_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub version:      u32,
}

impl CheckIn {
  /// Idempotency key for the trigger fired by this version of the record.
  pub fn event_key(&self) -> String {
    format!("{}:{}", self.checkin_id, self.version)
  }

  /// The time this check-in counts as attended: the clamped effective time
  /// when one was recorded, else the raw timestamp.
  pub fn attended_at(&self) -> DateTime<Utc> {
    self.effective_at.unwrap_or(self.timestamp)
  }
}

/// Input to [`AttendanceStore::insert_checkin`](crate::store::AttendanceStore::insert_checkin).
/// `timestamp` defaults to the time of insertion; the API always leaves it
/// empty so the server clock decides.
#[derive(Debug, Clone)]
pub struct NewCheckIn {
  pub email:     String,
  pub class_id:  String,
  pub section:   String,
  pub status:    Status,
  pub timestamp: Option<DateTime<Utc>>,
}
