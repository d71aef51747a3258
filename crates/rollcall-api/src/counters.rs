//! Handler for `GET /users/{email}/counters`.

use axum::{
  Json,
  extract::{Path, State},
};
use rollcall_core::{counters::UserCounters, store::AttendanceStore};

use crate::{AppState, error::ApiError};

/// `GET /users/{email}/counters`: zeros for a user nothing has counted yet.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(email): Path<String>,
) -> Result<Json<UserCounters>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let counters = state
    .store
    .get_counters(&email)
    .await
    .map_err(ApiError::store)?
    .unwrap_or_else(|| UserCounters::empty(email));
  Ok(Json(counters))
}
