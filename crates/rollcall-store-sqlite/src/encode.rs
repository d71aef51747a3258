//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision and
//! a `Z` suffix, which keeps them fixed-width and sortable as text. UUIDs are
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use rollcall_core::{
  counters::{LastAttended, UserCounters},
  event::{ReconcileFailure, TriggerEvent},
  record::{Account, CheckIn, ClassSchedule},
  status::Status,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status ───────────────────────────────────────────────────────────────────

pub fn encode_status(status: Status) -> Option<&'static str> { status.as_str() }

pub fn decode_status(s: Option<&str>) -> Result<Status> {
  Status::parse(s).map_err(|_| Error::UnknownStatus(s.unwrap_or_default().to_owned()))
}

// ─── LastAttended ─────────────────────────────────────────────────────────────

/// `(op, value)` parameter pair consumed by the counter upsert.
pub fn encode_last_attended(la: LastAttended) -> (&'static str, Option<String>) {
  match la {
    LastAttended::Unchanged => ("keep", None),
    LastAttended::Set(at) => ("set", Some(encode_dt(at))),
    LastAttended::Clear => ("clear", None),
  }
}

// ─── TriggerEvent ─────────────────────────────────────────────────────────────

pub fn encode_event(event: &TriggerEvent) -> Result<String> {
  Ok(serde_json::to_string(event)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub email:        String,
  pub display_name: Option<String>,
  pub created_at:   String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      email:        self.email,
      display_name: self.display_name,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `class_schedules` row.
pub struct RawSchedule {
  pub class_id: String,
  pub start_at: String,
  pub end_at:   String,
}

impl RawSchedule {
  pub fn into_schedule(self) -> Result<ClassSchedule> {
    Ok(ClassSchedule {
      class_id: self.class_id,
      start:    decode_dt(&self.start_at)?,
      end:      decode_dt(&self.end_at)?,
    })
  }
}

/// Column list matching [`RawCheckIn::from_row`].
pub const CHECKIN_COLUMNS: &str =
  "checkin_id, email, class_id, section, status, timestamp, effective_at, version";

/// Raw values read directly from a `checkins` row.
pub struct RawCheckIn {
  pub checkin_id:   String,
  pub email:        String,
  pub class_id:     String,
  pub section:      String,
  pub status:       Option<String>,
  pub timestamp:    String,
  pub effective_at: Option<String>,
  pub version:      u32,
}

impl RawCheckIn {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      checkin_id:   row.get(0)?,
      email:        row.get(1)?,
      class_id:     row.get(2)?,
      section:      row.get(3)?,
      status:       row.get(4)?,
      timestamp:    row.get(5)?,
      effective_at: row.get(6)?,
      version:      row.get(7)?,
    })
  }

  pub fn into_checkin(self) -> Result<CheckIn> {
    Ok(CheckIn {
      checkin_id:   decode_uuid(&self.checkin_id)?,
      email:        self.email,
      class_id:     self.class_id,
      section:      self.section,
      status:       decode_status(self.status.as_deref())?,
      timestamp:    decode_dt(&self.timestamp)?,
      effective_at: self.effective_at.as_deref().map(decode_dt).transpose()?,
      version:      self.version,
    })
  }
}

/// Raw values read directly from a `user_counters` row.
pub struct RawCounters {
  pub email:         String,
  pub present:       i64,
  pub excused:       i64,
  pub dishonest:     i64,
  pub last_attended: Option<String>,
}

impl RawCounters {
  pub fn into_counters(self) -> Result<UserCounters> {
    Ok(UserCounters {
      email:         self.email,
      present:       self.present,
      excused:       self.excused,
      dishonest:     self.dishonest,
      last_attended: self.last_attended.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `reconcile_failures` row.
pub struct RawFailure {
  pub failure_id:  String,
  pub event_json:  String,
  pub error:       String,
  pub recorded_at: String,
}

impl RawFailure {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      failure_id:  row.get(0)?,
      event_json:  row.get(1)?,
      error:       row.get(2)?,
      recorded_at: row.get(3)?,
    })
  }

  pub fn into_failure(self) -> Result<ReconcileFailure> {
    Ok(ReconcileFailure {
      failure_id:  decode_uuid(&self.failure_id)?,
      event:       serde_json::from_str(&self.event_json)?,
      error:       self.error,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
