//! Handlers for `/checkins` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/checkins` | Body: [`CreateBody`]; fires the creation trigger |
//! | `GET`   | `/checkins/{id}` | 404 if not found |
//! | `PATCH` | `/checkins/{id}` | Instructor only. Body: `{"status":"Excused"}`; fires the update trigger |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rollcall_core::{
  event::TriggerEvent,
  record::{CheckIn, NewCheckIn},
  status::Status,
  store::AttendanceStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::Instructor, error::ApiError, trigger};

/// A check-in plus whether its trigger ran to completion. `reconciled:
/// false` means the event is waiting in the failure log.
#[derive(Debug, Serialize)]
pub struct CheckInResponse {
  #[serde(flatten)]
  pub checkin:    CheckIn,
  pub reconciled: bool,
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// The check-in time is not part of the body: the server stamps it.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub email:    String,
  pub class_id: String,
  pub section:  String,
  #[serde(default)]
  pub status:   Status,
}

/// `POST /checkins`: returns 201 + the stored check-in.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  if state
    .store
    .get_account(&body.email)
    .await
    .map_err(ApiError::store)?
    .is_none()
  {
    return Err(ApiError::NotFound(format!("account {} not found", body.email)));
  }

  let checkin = state
    .store
    .insert_checkin(NewCheckIn {
      email:     body.email,
      class_id:  body.class_id,
      section:   body.section,
      status:    body.status,
      timestamp: None,
    })
    .await
    .map_err(ApiError::store)?;

  let event = TriggerEvent::CheckinCreated { checkin: checkin.clone() };
  let reconciled = trigger::fire(&*state.store, event).await.is_some();

  Ok((StatusCode::CREATED, Json(CheckInResponse { checkin, reconciled })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /checkins/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CheckIn>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let checkin = state
    .store
    .get_checkin(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("check-in {id} not found")))?;
  Ok(Json(checkin))
}

// ─── Status correction ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  #[serde(default)]
  pub status: Status,
}

/// `PATCH /checkins/{id}`: overwrite the status, then reconcile.
pub async fn update_status<S>(
  _: Instructor,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<CheckInResponse>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let (before, after) = state
    .store
    .set_checkin_status(id, body.status)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("check-in {id} not found")))?;

  let event = TriggerEvent::CheckinUpdated { before, after: after.clone() };
  let reconciled = trigger::fire(&*state.store, event).await.is_some();

  Ok(Json(CheckInResponse { checkin: after, reconciled }))
}
