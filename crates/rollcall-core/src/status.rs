//! Check-in status.
//!
//! A check-in is either marked with one of four statuses or not marked at
//! all. Only `Present`, `Excused` and `Dishonest` feed a counter; `Absent`
//! and `Unset` count toward nothing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

// ─── Mark ────────────────────────────────────────────────────────────────────

/// A status that has actually been recorded. This is the wire and storage
/// vocabulary; the absence of a mark is `null` / `NULL`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
pub enum Mark {
  Present,
  Excused,
  Dishonest,
  Absent,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// The status of a check-in, including the "never marked" state.
///
/// Serialises as `"Present" | "Excused" | "Dishonest" | "Absent" | null`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "Option<Mark>", into = "Option<Mark>")]
pub enum Status {
  Present,
  Excused,
  Dishonest,
  Absent,
  #[default]
  Unset,
}

/// The per-user counter a status contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
  Present,
  Excused,
  Dishonest,
}

impl Status {
  /// The counter this status feeds, or `None` for `Absent` and `Unset`.
  pub fn counter(self) -> Option<Counter> {
    match self {
      Self::Present => Some(Counter::Present),
      Self::Excused => Some(Counter::Excused),
      Self::Dishonest => Some(Counter::Dishonest),
      Self::Absent | Self::Unset => None,
    }
  }

  /// Whether the status contributes to any counter.
  pub fn is_counted(self) -> bool { self.counter().is_some() }

  pub fn mark(self) -> Option<Mark> { self.into() }

  /// Storage representation: the mark name, or `None` when unset.
  pub fn as_str(self) -> Option<&'static str> {
    self.mark().map(<&'static str>::from)
  }

  /// Inverse of [`Status::as_str`].
  pub fn parse(s: Option<&str>) -> Result<Self, strum::ParseError> {
    Ok(s.map(Mark::from_str).transpose()?.into())
  }
}

impl From<Option<Mark>> for Status {
  fn from(mark: Option<Mark>) -> Self {
    match mark {
      Some(Mark::Present) => Self::Present,
      Some(Mark::Excused) => Self::Excused,
      Some(Mark::Dishonest) => Self::Dishonest,
      Some(Mark::Absent) => Self::Absent,
      None => Self::Unset,
    }
  }
}

impl From<Status> for Option<Mark> {
  fn from(status: Status) -> Self {
    match status {
      Status::Present => Some(Mark::Present),
      Status::Excused => Some(Mark::Excused),
      Status::Dishonest => Some(Mark::Dishonest),
      Status::Absent => Some(Mark::Absent),
      Status::Unset => None,
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str().unwrap_or("unset"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counted_statuses() {
    assert_eq!(Status::Present.counter(), Some(Counter::Present));
    assert_eq!(Status::Excused.counter(), Some(Counter::Excused));
    assert_eq!(Status::Dishonest.counter(), Some(Counter::Dishonest));
    assert!(!Status::Absent.is_counted());
    assert!(!Status::Unset.is_counted());
  }

  #[test]
  fn json_uses_names_and_null() {
    assert_eq!(serde_json::to_string(&Status::Excused).unwrap(), "\"Excused\"");
    assert_eq!(serde_json::to_string(&Status::Unset).unwrap(), "null");

    let s: Status = serde_json::from_str("null").unwrap();
    assert_eq!(s, Status::Unset);
    let s: Status = serde_json::from_str("\"Dishonest\"").unwrap();
    assert_eq!(s, Status::Dishonest);
  }

  #[test]
  fn unknown_name_is_rejected() {
    assert!(serde_json::from_str::<Status>("\"present\"").is_err());
    assert!(Status::parse(Some("Late")).is_err());
  }

  #[test]
  fn storage_form() {
    assert_eq!(Status::Absent.as_str(), Some("Absent"));
    assert_eq!(Status::Unset.as_str(), None);
    assert_eq!(Status::parse(None).unwrap(), Status::Unset);
    assert_eq!(Status::parse(Some("Present")).unwrap(), Status::Present);
  }
}
