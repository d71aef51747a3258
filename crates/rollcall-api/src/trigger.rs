//! Fires reconciler triggers after check-in writes.

use chrono::Utc;
use rollcall_core::{
  event::TriggerEvent,
  reconcile::{Outcome, Reconciler},
  store::AttendanceStore,
};
use tracing::error;

/// Run the trigger for `event`. On failure the event is written to the
/// failure log and `None` is returned; the triggering write stands.
pub async fn fire<S: AttendanceStore>(store: &S, event: TriggerEvent) -> Option<Outcome> {
  match Reconciler::new(store).dispatch(&event, Utc::now()).await {
    Ok(outcome) => Some(outcome),
    Err(err) => {
      error!(
        event_key = %event.event_key(),
        error = %err,
        "reconciliation failed; recorded for replay"
      );
      if let Err(log_err) = store.record_failure(&event, &err.to_string()).await {
        error!(
          event_key = %event.event_key(),
          error = %log_err,
          "could not record reconciliation failure"
        );
      }
      None
    }
  }
}
