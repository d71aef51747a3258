//! JSON REST API for rollcall.
//!
//! Exposes an axum [`Router`] backed by any
//! [`rollcall_core::store::AttendanceStore`]. Every write to a check-in is
//! followed by the matching reconciler trigger; failed triggers land in the
//! store's failure log for an instructor to replay.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_api::api_router(state))
//! ```

pub mod accounts;
pub mod auth;
pub mod checkins;
pub mod classes;
pub mod counters;
pub mod error;
pub mod failures;
pub mod trigger;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rollcall_core::{gate::AccessGate, store::AttendanceStore};

pub use auth::AuthConfig;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S: AttendanceStore> {
  pub store: Arc<S>,
  pub gate:  Arc<AccessGate>,
  pub auth:  Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: AttendanceStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Accounts
    .route("/accounts", post(accounts::create::<S>))
    .route("/accounts/{email}", get(accounts::get_one::<S>))
    // Class schedules
    .route(
      "/classes/{class_id}",
      get(classes::get_one::<S>).put(classes::put_one::<S>),
    )
    // Check-ins
    .route("/checkins", post(checkins::create::<S>))
    .route(
      "/checkins/{id}",
      get(checkins::get_one::<S>).patch(checkins::update_status::<S>),
    )
    // Counters
    .route("/users/{email}/counters", get(counters::get_one::<S>))
    // Failure log
    .route("/admin/failures", get(failures::list::<S>))
    .route("/admin/failures/{id}/replay", post(failures::replay::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
