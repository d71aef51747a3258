//! Error types for `rollcall-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Raised by the access gate. The payload is the user-visible reason.
  #[error("permission denied: {0}")]
  PermissionDenied(String),

  /// The class schedule a check-in points at does not exist.
  #[error("class schedule not found: {0}")]
  MissingRelatedRecord(String),

  #[error("invalid schedule for class {class_id}: start {start} is after end {end}")]
  InvalidSchedule {
    class_id: String,
    start:    DateTime<Utc>,
    end:      DateTime<Utc>,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used as `map_err(Error::store)`.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
