//! Trigger events and the failure log that records undelivered ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::CheckIn;

/// A write to a check-in that the reconciler must react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerEvent {
  CheckinCreated { checkin: CheckIn },
  CheckinUpdated { before: CheckIn, after: CheckIn },
}

impl TriggerEvent {
  /// The post-image of the triggering write.
  pub fn checkin(&self) -> &CheckIn {
    match self {
      Self::CheckinCreated { checkin } => checkin,
      Self::CheckinUpdated { after, .. } => after,
    }
  }

  pub fn event_key(&self) -> String { self.checkin().event_key() }
}

/// A trigger that failed and is waiting for an operator to replay it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileFailure {
  pub failure_id:  Uuid,
  pub event:       TriggerEvent,
  pub error:       String,
  pub recorded_at: DateTime<Utc>,
}
