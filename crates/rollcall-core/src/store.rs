//! Store traits.
//!
//! [`CounterStore`] is the narrow surface the reconciler needs: point reads
//! of class schedules, a top-1 query over check-ins, and one atomic update
//! primitive for counters. There is no read-modify-write of
//! counter values.
//!
//! [`AttendanceStore`] extends it with the document CRUD the API layer uses.
//! Both are implemented by storage backends (e.g. `rollcall-store-sqlite`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  counters::{CounterUpdate, UserCounters},
  event::{ReconcileFailure, TriggerEvent},
  record::{Account, CheckIn, ClassSchedule, NewAccount, NewCheckIn},
  status::Status,
};

/// Result of [`CounterStore::apply_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  /// The update was written.
  Written,
  /// An update with the same event key was written earlier; nothing changed.
  Duplicate,
}

/// What the reconciler needs from a document store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CounterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a class schedule by ID. Returns `None` if not found.
  fn get_schedule<'a>(
    &'a self,
    class_id: &'a str,
  ) -> impl Future<Output = Result<Option<ClassSchedule>, Self::Error>> + Send + 'a;

  /// The most recent check-in for `email` in `section` whose status is
  /// `Present` and whose timestamp is at or before `not_after`. "Most
  /// recent" orders by [`CheckIn::attended_at`].
  fn latest_present<'a>(
    &'a self,
    email: &'a str,
    section: &'a str,
    not_after: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<CheckIn>, Self::Error>> + Send + 'a;

  /// Apply `update` to the user's counter record as one atomic write,
  /// creating the record if needed. Counters never drop below zero. When
  /// `update.effective_at` is set it is stored on the triggering check-in in
  /// the same write.
  ///
  /// An update whose `event_key` has already been applied is skipped and
  /// reported as [`Applied::Duplicate`].
  fn apply_update<'a>(
    &'a self,
    update: &'a CounterUpdate,
  ) -> impl Future<Output = Result<Applied, Self::Error>> + Send + 'a;
}

/// Full document store used by the API layer.
pub trait AttendanceStore: CounterStore {
  // ── Accounts ──────────────────────────────────────────────────────────

  /// Persist a new account. Returns `None` if the email is already taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn get_account<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  // ── Class schedules ───────────────────────────────────────────────────

  /// Insert or replace the schedule for `schedule.class_id`.
  fn put_schedule(
    &self,
    schedule: ClassSchedule,
  ) -> impl Future<Output = Result<ClassSchedule, Self::Error>> + Send + '_;

  // ── Check-ins ─────────────────────────────────────────────────────────

  /// Record a new check-in at version 0. The ID is assigned by the store,
  /// and so is the timestamp when the input leaves it empty.
  fn insert_checkin(
    &self,
    input: NewCheckIn,
  ) -> impl Future<Output = Result<CheckIn, Self::Error>> + Send + '_;

  fn get_checkin(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CheckIn>, Self::Error>> + Send + '_;

  /// Overwrite a check-in's status and bump its version.
  ///
  /// Returns the `(before, after)` images, or `None` if the check-in does
  /// not exist.
  fn set_checkin_status(
    &self,
    id: Uuid,
    status: Status,
  ) -> impl Future<Output = Result<Option<(CheckIn, CheckIn)>, Self::Error>> + Send + '_;

  // ── Counters ──────────────────────────────────────────────────────────

  /// Returns `None` if no update has ever touched this user.
  fn get_counters<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserCounters>, Self::Error>> + Send + 'a;

  // ── Failure log ───────────────────────────────────────────────────────

  fn record_failure<'a>(
    &'a self,
    event: &'a TriggerEvent,
    error: &'a str,
  ) -> impl Future<Output = Result<ReconcileFailure, Self::Error>> + Send + 'a;

  fn list_failures(
    &self,
  ) -> impl Future<Output = Result<Vec<ReconcileFailure>, Self::Error>> + Send + '_;

  fn get_failure(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ReconcileFailure>, Self::Error>> + Send + '_;

  /// Returns `false` if there was nothing to delete.
  fn delete_failure(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
