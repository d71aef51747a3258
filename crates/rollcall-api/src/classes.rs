//! Handlers for `/classes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/classes/{class_id}` | Instructor only. Body: `{"start":"...","end":"..."}` |
//! | `GET`  | `/classes/{class_id}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use rollcall_core::{
  record::ClassSchedule,
  store::{AttendanceStore, CounterStore},
};
use serde::Deserialize;

use crate::{AppState, auth::Instructor, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

/// `PUT /classes/{class_id}`: insert or replace the class window.
pub async fn put_one<S>(
  _: Instructor,
  State(state): State<AppState<S>>,
  Path(class_id): Path<String>,
  Json(body): Json<ScheduleBody>,
) -> Result<Json<ClassSchedule>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let schedule = ClassSchedule::new(class_id, body.start, body.end)?;
  let schedule = state
    .store
    .put_schedule(schedule)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(schedule))
}

/// `GET /classes/{class_id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(class_id): Path<String>,
) -> Result<Json<ClassSchedule>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let schedule = state
    .store
    .get_schedule(&class_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("class {class_id} not found")))?;
  Ok(Json(schedule))
}
