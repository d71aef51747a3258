//! The attendance reconciler.
//!
//! Reacts to check-in writes and keeps the owning user's [`UserCounters`]
//! consistent with the current status of every check-in:
//!
//! - creation adds exactly one unit to at most one counter;
//! - a status edit removes one unit from the old status's counter and adds
//!   one to the new status's counter in the same atomic write;
//! - `last_attended` tracks the effective time of the latest `Present`
//!   check-in.
//!
//! [`UserCounters`]: crate::counters::UserCounters

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  counters::{CounterDelta, CounterUpdate, LastAttended},
  event::TriggerEvent,
  record::CheckIn,
  status::Status,
  store::{Applied, CounterStore},
};

/// What a trigger invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Nothing to apply (uncounted creation, or a write that kept the status).
  NoOp,
  /// The update was written.
  Applied(CounterUpdate),
  /// The same event was applied by an earlier delivery.
  AlreadyApplied(CounterUpdate),
}

/// Runs the check-in triggers against a [`CounterStore`].
pub struct Reconciler<'a, S> {
  store: &'a S,
}

impl<'a, S: CounterStore> Reconciler<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Route `event` to the creation or update path.
  pub async fn dispatch(
    &self,
    event: &TriggerEvent,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    match event {
      TriggerEvent::CheckinCreated { checkin } => {
        self.on_checkin_create(checkin).await
      }
      TriggerEvent::CheckinUpdated { before, after } => {
        self.on_checkin_update(before, after, now).await
      }
    }
  }

  /// Creation path. The check-in's own timestamp is the instant that gets
  /// clamped, so a redelivered event computes the same value.
  pub async fn on_checkin_create(&self, checkin: &CheckIn) -> Result<Outcome> {
    if !checkin.status.is_counted() {
      debug!(checkin_id = %checkin.checkin_id, status = %checkin.status, "uncounted check-in");
      return Ok(Outcome::NoOp);
    }

    let mut delta = CounterDelta::default();
    delta.increment(checkin.status);

    let effective_at = if checkin.status == Status::Present {
      self.clamped(checkin, checkin.timestamp).await?
    } else {
      None
    };

    self
      .apply(CounterUpdate {
        email: checkin.email.clone(),
        event_key: checkin.event_key(),
        checkin_id: checkin.checkin_id,
        delta,
        last_attended: effective_at.map_or(LastAttended::Unchanged, LastAttended::Set),
        effective_at,
      })
      .await
  }

  /// Update path. `now` bounds the fallback query and is the instant
  /// clamped when the new status is `Present`.
  pub async fn on_checkin_update(
    &self,
    before: &CheckIn,
    after: &CheckIn,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    if before.status == after.status {
      return Ok(Outcome::NoOp);
    }

    let mut delta = CounterDelta::default();
    delta.decrement(before.status);
    delta.increment(after.status);

    let (last_attended, effective_at) = if after.status == Status::Present {
      let effective_at = self.clamped(after, now).await?;
      (effective_at.map_or(LastAttended::Unchanged, LastAttended::Set), effective_at)
    } else {
      // Re-derive from what is persisted: every other Present check-in
      // carries the effective time it was clamped to.
      let previous = self
        .store
        .latest_present(&after.email, &after.section, now)
        .await
        .map_err(Error::store)?;
      let last_attended = match previous {
        Some(previous) => LastAttended::Set(previous.attended_at()),
        None => LastAttended::Clear,
      };
      (last_attended, None)
    };

    self
      .apply(CounterUpdate {
        email: after.email.clone(),
        event_key: after.event_key(),
        checkin_id: after.checkin_id,
        delta,
        last_attended,
        effective_at,
      })
      .await
  }

  /// Effective time of a check-in made at `now` for `class_id`.
  pub async fn effective_time(
    &self,
    class_id: &str,
    now: DateTime<Utc>,
  ) -> Result<DateTime<Utc>> {
    let schedule = self
      .store
      .get_schedule(class_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::MissingRelatedRecord(class_id.to_owned()))?;
    Ok(schedule.clamp(now))
  }

  /// A missing class schedule yields `None`, which skips the
  /// `last_attended` change instead of failing the whole trigger.
  async fn clamped(
    &self,
    checkin: &CheckIn,
    now: DateTime<Utc>,
  ) -> Result<Option<DateTime<Utc>>> {
    match self.effective_time(&checkin.class_id, now).await {
      Ok(at) => Ok(Some(at)),
      Err(Error::MissingRelatedRecord(class_id)) => {
        warn!(
          checkin_id = %checkin.checkin_id,
          class_id = %class_id,
          "class schedule not found; leaving last_attended unchanged"
        );
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }

  async fn apply(&self, update: CounterUpdate) -> Result<Outcome> {
    match self.store.apply_update(&update).await.map_err(Error::store)? {
      Applied::Written => {
        info!(
          email = %update.email,
          event_key = %update.event_key,
          present = update.delta.present,
          excused = update.delta.excused,
          dishonest = update.delta.dishonest,
          "counters updated"
        );
        Ok(Outcome::Applied(update))
      }
      Applied::Duplicate => {
        warn!(event_key = %update.event_key, "duplicate delivery ignored");
        Ok(Outcome::AlreadyApplied(update))
      }
    }
  }
}
