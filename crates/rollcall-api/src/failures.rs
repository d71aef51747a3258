//! Handlers for the reconciliation failure log.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/failures` | Instructor only |
//! | `POST` | `/admin/failures/{id}/replay` | Instructor only; deletes the entry once the event is applied |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use rollcall_core::{
  event::ReconcileFailure,
  reconcile::{Outcome, Reconciler},
  store::AttendanceStore,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{AppState, auth::Instructor, error::ApiError};

/// `GET /admin/failures`
pub async fn list<S>(
  _: Instructor,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<ReconcileFailure>>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let failures = state.store.list_failures().await.map_err(ApiError::store)?;
  Ok(Json(failures))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayResult {
  Applied,
  AlreadyApplied,
  NoOp,
}

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
  pub failure_id: Uuid,
  pub result:     ReplayResult,
}

/// `POST /admin/failures/{id}/replay`
///
/// A replay that fails again leaves the entry in place and returns the error.
pub async fn replay<S>(
  _: Instructor,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ReplayResponse>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let failure = state
    .store
    .get_failure(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("failure {id} not found")))?;

  let outcome = Reconciler::new(&*state.store)
    .dispatch(&failure.event, Utc::now())
    .await?;

  state.store.delete_failure(id).await.map_err(ApiError::store)?;
  info!(failure_id = %id, event_key = %failure.event.event_key(), "failure replayed");

  let result = match outcome {
    Outcome::Applied(_) => ReplayResult::Applied,
    Outcome::AlreadyApplied(_) => ReplayResult::AlreadyApplied,
    Outcome::NoOp => ReplayResult::NoOp,
  };
  Ok(Json(ReplayResponse { failure_id: id, result }))
}
