//! [`SqliteStore`]: the SQLite implementation of [`CounterStore`] and
//! [`AttendanceStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rollcall_core::{
  counters::{CounterUpdate, UserCounters},
  event::{ReconcileFailure, TriggerEvent},
  record::{Account, CheckIn, ClassSchedule, NewAccount, NewCheckIn},
  status::Status,
  store::{Applied, AttendanceStore, CounterStore},
};

use crate::{
  encode::{
    CHECKIN_COLUMNS, RawAccount, RawCheckIn, RawCounters, RawFailure,
    RawSchedule, encode_dt, encode_event, encode_last_attended, encode_status,
    encode_uuid,
  },
  schema::{MIGRATE_V1, SCHEMA},
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let version: i64 =
          conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version == 1 {
          conn.execute_batch(MIGRATE_V1)?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Forget idempotency keys applied before `cutoff`. A delivery of one of
  /// those events after this call would be applied again.
  ///
  /// Returns the number of keys removed.
  pub async fn prune_applied_events(&self, cutoff: DateTime<Utc>) -> Result<usize> {
    let cutoff = encode_dt(cutoff);

    let pruned = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM applied_events WHERE applied_at < ?1",
          rusqlite::params![cutoff],
        )?)
      })
      .await?;

    Ok(pruned)
  }
}

/// Storage keeps microseconds; trim before writing so callers see the value
/// that a later read returns.
fn storable(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

// ─── CounterStore impl ───────────────────────────────────────────────────────

impl CounterStore for SqliteStore {
  type Error = Error;

  async fn get_schedule(&self, class_id: &str) -> Result<Option<ClassSchedule>> {
    let class_id = class_id.to_owned();

    let raw: Option<RawSchedule> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT class_id, start_at, end_at FROM class_schedules WHERE class_id = ?1",
            rusqlite::params![class_id],
            |row| {
              Ok(RawSchedule {
                class_id: row.get(0)?,
                start_at: row.get(1)?,
                end_at:   row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSchedule::into_schedule).transpose()
  }

  async fn latest_present(
    &self,
    email:     &str,
    section:   &str,
    not_after: DateTime<Utc>,
  ) -> Result<Option<CheckIn>> {
    let email      = email.to_owned();
    let section    = section.to_owned();
    let not_after  = encode_dt(not_after);
    let present    = encode_status(Status::Present);

    let raw: Option<RawCheckIn> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {CHECKIN_COLUMNS} FROM checkins
               WHERE email = ?1 AND section = ?2 AND status = ?3
                 AND timestamp <= ?4
               ORDER BY COALESCE(effective_at, timestamp) DESC, timestamp DESC
               LIMIT 1"
            ),
            rusqlite::params![email, section, present, not_after],
            RawCheckIn::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCheckIn::into_checkin).transpose()
  }

  async fn apply_update(&self, update: &CounterUpdate) -> Result<Applied> {
    let email        = update.email.clone();
    let event_key    = update.event_key.clone();
    let checkin_id   = encode_uuid(update.checkin_id);
    let delta        = update.delta;
    let (op, at)     = encode_last_attended(update.last_attended);
    let effective_at = update.effective_at.map(encode_dt);
    let applied_at   = encode_dt(Utc::now());

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let fresh = tx.execute(
          "INSERT OR IGNORE INTO applied_events (event_key, email, applied_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![event_key, email, applied_at],
        )?;
        if fresh == 0 {
          // Dropping the transaction rolls it back.
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO user_counters (email, present, excused, dishonest, last_attended)
           VALUES (?1, MAX(?2, 0), MAX(?3, 0), MAX(?4, 0),
                   CASE ?5 WHEN 'set' THEN ?6 ELSE NULL END)
           ON CONFLICT(email) DO UPDATE SET
             present       = MAX(present + ?2, 0),
             excused       = MAX(excused + ?3, 0),
             dishonest     = MAX(dishonest + ?4, 0),
             last_attended = CASE ?5
                               WHEN 'keep' THEN last_attended
                               WHEN 'set'  THEN ?6
                               ELSE NULL
                             END",
          rusqlite::params![
            email,
            delta.present,
            delta.excused,
            delta.dishonest,
            op,
            at,
          ],
        )?;

        if let Some(effective_at) = effective_at {
          tx.execute(
            "UPDATE checkins SET effective_at = ?2 WHERE checkin_id = ?1",
            rusqlite::params![checkin_id, effective_at],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if written { Applied::Written } else { Applied::Duplicate })
  }
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> Result<Option<Account>> {
    let account = Account {
      email:        input.email,
      display_name: input.display_name,
      created_at:   storable(Utc::now()),
    };

    let email        = account.email.clone();
    let display_name = account.display_name.clone();
    let at_str       = encode_dt(account.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO accounts (email, display_name, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![email, display_name, at_str],
        )?)
      })
      .await?;

    Ok((inserted > 0).then_some(account))
  }

  async fn get_account(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT email, display_name, created_at FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |row| {
              Ok(RawAccount {
                email:        row.get(0)?,
                display_name: row.get(1)?,
                created_at:   row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  // ── Class schedules ───────────────────────────────────────────────────────

  async fn put_schedule(&self, schedule: ClassSchedule) -> Result<ClassSchedule> {
    let schedule = ClassSchedule {
      start: storable(schedule.start),
      end: storable(schedule.end),
      ..schedule
    };

    let class_id  = schedule.class_id.clone();
    let start_str = encode_dt(schedule.start);
    let end_str   = encode_dt(schedule.end);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO class_schedules (class_id, start_at, end_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(class_id) DO UPDATE SET
             start_at = excluded.start_at,
             end_at   = excluded.end_at",
          rusqlite::params![class_id, start_str, end_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(schedule)
  }

  // ── Check-ins ─────────────────────────────────────────────────────────────

  async fn insert_checkin(&self, input: NewCheckIn) -> Result<CheckIn> {
    let checkin = CheckIn {
      checkin_id:   Uuid::new_v4(),
      email:        input.email,
      class_id:     input.class_id,
      section:      input.section,
      status:       input.status,
      timestamp:    storable(input.timestamp.unwrap_or_else(Utc::now)),
      effective_at: None,
      version:      0,
    };

    let id_str     = encode_uuid(checkin.checkin_id);
    let email      = checkin.email.clone();
    let class_id   = checkin.class_id.clone();
    let section    = checkin.section.clone();
    let status     = encode_status(checkin.status);
    let ts_str     = encode_dt(checkin.timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO checkins (
             checkin_id, email, class_id, section, status, timestamp, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
          rusqlite::params![id_str, email, class_id, section, status, ts_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(checkin)
  }

  async fn get_checkin(&self, id: Uuid) -> Result<Option<CheckIn>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCheckIn> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CHECKIN_COLUMNS} FROM checkins WHERE checkin_id = ?1"),
            rusqlite::params![id_str],
            RawCheckIn::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCheckIn::into_checkin).transpose()
  }

  async fn set_checkin_status(
    &self,
    id:     Uuid,
    status: Status,
  ) -> Result<Option<(CheckIn, CheckIn)>> {
    let id_str     = encode_uuid(id);
    let status_str = encode_status(status);

    let raw: Option<RawCheckIn> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let before = tx
          .query_row(
            &format!("SELECT {CHECKIN_COLUMNS} FROM checkins WHERE checkin_id = ?1"),
            rusqlite::params![id_str],
            RawCheckIn::from_row,
          )
          .optional()?;

        if before.is_some() {
          tx.execute(
            "UPDATE checkins SET status = ?2, version = version + 1
             WHERE checkin_id = ?1",
            rusqlite::params![id_str, status_str],
          )?;
          tx.commit()?;
        }

        Ok(before)
      })
      .await?;

    let Some(before) = raw.map(RawCheckIn::into_checkin).transpose()? else {
      return Ok(None);
    };
    let after = CheckIn {
      status,
      version: before.version + 1,
      ..before.clone()
    };
    Ok(Some((before, after)))
  }

  // ── Counters ──────────────────────────────────────────────────────────────

  async fn get_counters(&self, email: &str) -> Result<Option<UserCounters>> {
    let email = email.to_owned();

    let raw: Option<RawCounters> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT email, present, excused, dishonest, last_attended
             FROM user_counters WHERE email = ?1",
            rusqlite::params![email],
            |row| {
              Ok(RawCounters {
                email:         row.get(0)?,
                present:       row.get(1)?,
                excused:       row.get(2)?,
                dishonest:     row.get(3)?,
                last_attended: row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCounters::into_counters).transpose()
  }

  // ── Failure log ───────────────────────────────────────────────────────────

  async fn record_failure(
    &self,
    event: &TriggerEvent,
    error: &str,
  ) -> Result<ReconcileFailure> {
    let failure = ReconcileFailure {
      failure_id:  Uuid::new_v4(),
      event:       event.clone(),
      error:       error.to_owned(),
      recorded_at: storable(Utc::now()),
    };

    let id_str     = encode_uuid(failure.failure_id);
    let event_json = encode_event(&failure.event)?;
    let error      = failure.error.clone();
    let at_str     = encode_dt(failure.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reconcile_failures (failure_id, event_json, error, recorded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, event_json, error, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(failure)
  }

  async fn list_failures(&self) -> Result<Vec<ReconcileFailure>> {
    let raws: Vec<RawFailure> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT failure_id, event_json, error, recorded_at
           FROM reconcile_failures ORDER BY recorded_at",
        )?;
        let rows = stmt
          .query_map([], RawFailure::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFailure::into_failure).collect()
  }

  async fn get_failure(&self, id: Uuid) -> Result<Option<ReconcileFailure>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFailure> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT failure_id, event_json, error, recorded_at
             FROM reconcile_failures WHERE failure_id = ?1",
            rusqlite::params![id_str],
            RawFailure::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFailure::into_failure).transpose()
  }

  async fn delete_failure(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM reconcile_failures WHERE failure_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }
}
