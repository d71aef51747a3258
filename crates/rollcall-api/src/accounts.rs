//! Handlers for `/accounts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/accounts` | Body: `{"email":"...","display_name":"..."}`; 403 outside the approved domain, 409 if taken |
//! | `GET`  | `/accounts/{email}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rollcall_core::{
  record::{Account, NewAccount},
  store::AttendanceStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub email:        String,
  pub display_name: Option<String>,
}

/// `POST /accounts`: the access gate runs before anything is written.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  state.gate.check(&body.email)?;

  let email = body.email.clone();
  let account = state
    .store
    .create_account(NewAccount {
      email:        body.email,
      display_name: body.display_name,
    })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Conflict(format!("account {email} already exists")))?;
  Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /accounts/{email}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(email): Path<String>,
) -> Result<Json<Account>, ApiError>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  let account = state
    .store
    .get_account(&email)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("account {email} not found")))?;
  Ok(Json(account))
}
