//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use argon2::{
  Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString,
};
use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{DateTime, TimeZone, Utc};
use rand_core::OsRng;
use rollcall_core::{
  counters::{CounterUpdate, UserCounters},
  event::{ReconcileFailure, TriggerEvent},
  gate::AccessGate,
  record::{Account, CheckIn, ClassSchedule, NewAccount, NewCheckIn},
  status::Status,
  store::{Applied, AttendanceStore, CounterStore},
};
use rollcall_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, AuthConfig, api_router};

// ─── Flaky store ─────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum FlakyError {
  #[error(transparent)]
  Inner(#[from] rollcall_store_sqlite::Error),
  #[error("counter store unavailable")]
  Unavailable,
}

/// Delegates to SQLite, but can refuse counter writes.
#[derive(Clone)]
struct FlakyStore {
  inner:   SqliteStore,
  offline: Arc<AtomicBool>,
}

impl CounterStore for FlakyStore {
  type Error = FlakyError;

  async fn get_schedule(&self, class_id: &str) -> Result<Option<ClassSchedule>, FlakyError> {
    Ok(self.inner.get_schedule(class_id).await?)
  }

  async fn latest_present(
    &self,
    email: &str,
    section: &str,
    not_after: DateTime<Utc>,
  ) -> Result<Option<CheckIn>, FlakyError> {
    Ok(self.inner.latest_present(email, section, not_after).await?)
  }

  async fn apply_update(&self, update: &CounterUpdate) -> Result<Applied, FlakyError> {
    if self.offline.load(Ordering::SeqCst) {
      return Err(FlakyError::Unavailable);
    }
    Ok(self.inner.apply_update(update).await?)
  }
}

impl AttendanceStore for FlakyStore {
  async fn create_account(&self, input: NewAccount) -> Result<Option<Account>, FlakyError> {
    Ok(self.inner.create_account(input).await?)
  }

  async fn get_account(&self, email: &str) -> Result<Option<Account>, FlakyError> {
    Ok(self.inner.get_account(email).await?)
  }

  async fn put_schedule(&self, schedule: ClassSchedule) -> Result<ClassSchedule, FlakyError> {
    Ok(self.inner.put_schedule(schedule).await?)
  }

  async fn insert_checkin(&self, input: NewCheckIn) -> Result<CheckIn, FlakyError> {
    Ok(self.inner.insert_checkin(input).await?)
  }

  async fn get_checkin(&self, id: Uuid) -> Result<Option<CheckIn>, FlakyError> {
    Ok(self.inner.get_checkin(id).await?)
  }

  async fn set_checkin_status(
    &self,
    id: Uuid,
    status: Status,
  ) -> Result<Option<(CheckIn, CheckIn)>, FlakyError> {
    Ok(self.inner.set_checkin_status(id, status).await?)
  }

  async fn get_counters(&self, email: &str) -> Result<Option<UserCounters>, FlakyError> {
    Ok(self.inner.get_counters(email).await?)
  }

  async fn record_failure(
    &self,
    event: &TriggerEvent,
    error: &str,
  ) -> Result<ReconcileFailure, FlakyError> {
    Ok(self.inner.record_failure(event, error).await?)
  }

  async fn list_failures(&self) -> Result<Vec<ReconcileFailure>, FlakyError> {
    Ok(self.inner.list_failures().await?)
  }

  async fn get_failure(&self, id: Uuid) -> Result<Option<ReconcileFailure>, FlakyError> {
    Ok(self.inner.get_failure(id).await?)
  }

  async fn delete_failure(&self, id: Uuid) -> Result<bool, FlakyError> {
    Ok(self.inner.delete_failure(id).await?)
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

const EMAIL: &str = "smithj@miamioh.edu";
const PASSWORD: &str = "correct horse";

struct Harness {
  app:     Router,
  offline: Arc<AtomicBool>,
}

async fn harness() -> Harness {
  // Cheap parameters keep the tests fast; verification reads them back from
  // the PHC string.
  let params = Params::new(1024, 1, 1, None).unwrap();
  let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    .hash_password(PASSWORD.as_bytes(), &SaltString::generate(&mut OsRng))
    .unwrap()
    .to_string();

  let offline = Arc::new(AtomicBool::new(false));
  let store = FlakyStore {
    inner:   SqliteStore::open_in_memory().await.unwrap(),
    offline: offline.clone(),
  };

  let state = AppState {
    store: Arc::new(store),
    gate:  Arc::new(AccessGate::new("miamioh.edu")),
    auth:  Arc::new(AuthConfig {
      username:      "prof".to_owned(),
      password_hash: hash,
    }),
  };
  Harness { app: api_router(state), offline }
}

/// A session that has already ended: check-ins clamp to its end.
fn at(h: u32, m: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 9, 3, h, m, 0).unwrap()
}

/// A session that has not started yet: check-ins clamp to its start.
fn upcoming(h: u32, m: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2099, 9, 3, h, m, 0).unwrap()
}

fn instructor() -> String {
  format!("Basic {}", B64.encode(format!("prof:{PASSWORD}")))
}

async fn send(
  app: &Router,
  method: Method,
  uri: &str,
  body: Option<Value>,
  auth: Option<String>,
) -> (StatusCode, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(auth) = auth {
    req = req.header(header::AUTHORIZATION, auth);
  }
  let req = match body {
    Some(body) => req
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string())),
    None => req.body(Body::empty()),
  }
  .unwrap();

  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn put_class(app: &Router, class_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
  let (status, _) = send(
    app,
    Method::PUT,
    &format!("/classes/{class_id}"),
    Some(json!({ "start": start, "end": end })),
    Some(instructor()),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}

/// `cse-262` met in the past; `cse-174` meets in the future.
async fn setup_class_and_account(app: &Router) {
  let (status, _) = send(
    app,
    Method::POST,
    "/accounts",
    Some(json!({ "email": EMAIL })),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  put_class(app, "cse-262", at(9, 0), at(9, 50)).await;
  put_class(app, "cse-174", upcoming(9, 0), upcoming(9, 50)).await;
}

async fn check_in_to(app: &Router, class_id: &str, status: &str) -> Value {
  let (code, body) = send(
    app,
    Method::POST,
    "/checkins",
    Some(json!({
      "email": EMAIL,
      "class_id": class_id,
      "section": "A",
      "status": status,
    })),
    None,
  )
  .await;
  assert_eq!(code, StatusCode::CREATED);
  body
}

async fn check_in(app: &Router, status: &str) -> Value {
  check_in_to(app, "cse-262", status).await
}

async fn counters(app: &Router) -> Value {
  let (code, body) =
    send(app, Method::GET, &format!("/users/{EMAIL}/counters"), None, None).await;
  assert_eq!(code, StatusCode::OK);
  body
}

fn last_attended(counters: &Value) -> Option<DateTime<Utc>> {
  serde_json::from_value(counters["last_attended"].clone()).unwrap()
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn account_in_approved_domain_is_created() {
  let h = harness().await;
  let (status, body) = send(
    &h.app,
    Method::POST,
    "/accounts",
    Some(json!({ "email": EMAIL, "display_name": "Jordan Smith" })),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["email"], EMAIL);

  let (status, body) =
    send(&h.app, Method::GET, &format!("/accounts/{EMAIL}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["display_name"], "Jordan Smith");
}

#[tokio::test]
async fn spoofed_domain_is_rejected_without_writing() {
  let h = harness().await;
  let spoof = "attacker@miamioh.edu.evil.com";
  let (status, body) = send(
    &h.app,
    Method::POST,
    "/accounts",
    Some(json!({ "email": spoof })),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "Unauthorized email");

  let (status, _) =
    send(&h.app, Method::GET, &format!("/accounts/{spoof}"), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_account_conflicts() {
  let h = harness().await;
  let body = json!({ "email": EMAIL });
  send(&h.app, Method::POST, "/accounts", Some(body.clone()), None).await;
  let (status, _) = send(&h.app, Method::POST, "/accounts", Some(body), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn concurrent_duplicate_accounts_yield_one_conflict() {
  let h = harness().await;
  let body = json!({ "email": EMAIL });
  let ((a, _), (b, _)) = tokio::join!(
    send(&h.app, Method::POST, "/accounts", Some(body.clone()), None),
    send(&h.app, Method::POST, "/accounts", Some(body), None),
  );
  let mut statuses = [a.as_u16(), b.as_u16()];
  statuses.sort();
  assert_eq!(statuses, [201, 409]);
}

// ─── Class schedules ─────────────────────────────────────────────────────────

#[tokio::test]
async fn schedule_writes_need_instructor_auth() {
  let h = harness().await;
  let body = json!({ "start": at(9, 0), "end": at(9, 50) });

  let (status, _) =
    send(&h.app, Method::PUT, "/classes/cse-262", Some(body.clone()), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) =
    send(&h.app, Method::PUT, "/classes/cse-262", Some(body), Some(instructor())).await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(&h.app, Method::GET, "/classes/cse-262", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["class_id"], "cse-262");
}

#[tokio::test]
async fn inverted_schedule_is_a_bad_request() {
  let h = harness().await;
  let (status, _) = send(
    &h.app,
    Method::PUT,
    "/classes/cse-262",
    Some(json!({ "start": at(9, 50), "end": at(9, 0) })),
    Some(instructor()),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Check-ins ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn check_in_requires_an_account() {
  let h = harness().await;
  let (status, _) = send(
    &h.app,
    Method::POST,
    "/checkins",
    Some(json!({ "email": EMAIL, "class_id": "cse-262", "section": "A", "status": "Present" })),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn early_check_in_counts_at_class_start() {
  let h = harness().await;
  setup_class_and_account(&h.app).await;

  let body = check_in_to(&h.app, "cse-174", "Present").await;
  assert_eq!(body["reconciled"], true);
  assert_eq!(body["version"], 0);

  let c = counters(&h.app).await;
  assert_eq!(c["present"], 1);
  assert_eq!(last_attended(&c), Some(upcoming(9, 0)));
}

#[tokio::test]
async fn late_check_in_counts_at_class_end() {
  let h = harness().await;
  setup_class_and_account(&h.app).await;

  check_in(&h.app, "Present").await;

  let c = counters(&h.app).await;
  assert_eq!(c["present"], 1);
  assert_eq!(last_attended(&c), Some(at(9, 50)));
}

#[tokio::test]
async fn client_supplied_timestamp_is_ignored() {
  let h = harness().await;
  setup_class_and_account(&h.app).await;
  let sent_at = Utc::now() - chrono::Duration::seconds(1);

  let (status, body) = send(
    &h.app,
    Method::POST,
    "/checkins",
    Some(json!({
      "email": EMAIL,
      "class_id": "cse-262",
      "section": "A",
      "status": "Present",
      "timestamp": at(9, 5),
    })),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let stamped: DateTime<Utc> = serde_json::from_value(body["timestamp"].clone()).unwrap();
  assert!(stamped >= sent_at);
  assert_eq!(last_attended(&counters(&h.app).await), Some(at(9, 50)));
}

#[tokio::test]
async fn correcting_present_to_absent_clears_last_attended() {
  let h = harness().await;
  setup_class_and_account(&h.app).await;
  let body = check_in(&h.app, "Present").await;
  let uri = format!("/checkins/{}", body["checkin_id"].as_str().unwrap());

  let (status, _) =
    send(&h.app, Method::PATCH, &uri, Some(json!({ "status": "Absent" })), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = send(
    &h.app,
    Method::PATCH,
    &uri,
    Some(json!({ "status": "Absent" })),
    Some(instructor()),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "Absent");
  assert_eq!(body["version"], 1);

  let c = counters(&h.app).await;
  assert_eq!(c["present"], 0);
  assert_eq!(last_attended(&c), None);
}

#[tokio::test]
async fn correcting_excused_to_dishonest_moves_one_unit() {
  let h = harness().await;
  setup_class_and_account(&h.app).await;
  check_in(&h.app, "Present").await;
  let body = check_in(&h.app, "Excused").await;
  let uri = format!("/checkins/{}", body["checkin_id"].as_str().unwrap());

  send(
    &h.app,
    Method::PATCH,
    &uri,
    Some(json!({ "status": "Dishonest" })),
    Some(instructor()),
  )
  .await;

  let c = counters(&h.app).await;
  assert_eq!((c["present"].as_i64(), c["excused"].as_i64(), c["dishonest"].as_i64()),
             (Some(1), Some(0), Some(1)));
  assert_eq!(last_attended(&c), Some(at(9, 50)));
}

#[tokio::test]
async fn unknown_checkin_is_not_found() {
  let h = harness().await;
  let uri = format!("/checkins/{}", Uuid::new_v4());
  let (status, _) = send(&h.app, Method::GET, &uri, None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(
    &h.app,
    Method::PATCH,
    &uri,
    Some(json!({ "status": "Excused" })),
    Some(instructor()),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn counters_default_to_zero() {
  let h = harness().await;
  let c = counters(&h.app).await;
  assert_eq!(c["present"], 0);
  assert_eq!(c["excused"], 0);
  assert_eq!(c["dishonest"], 0);
  assert!(c["last_attended"].is_null());
}

// ─── Failure log ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_trigger_is_logged_and_replayable() {
  let h = harness().await;
  setup_class_and_account(&h.app).await;

  h.offline.store(true, Ordering::SeqCst);
  let body = check_in(&h.app, "Excused").await;
  assert_eq!(body["reconciled"], false);
  assert_eq!(counters(&h.app).await["excused"], 0);

  let (status, failures) =
    send(&h.app, Method::GET, "/admin/failures", None, Some(instructor())).await;
  assert_eq!(status, StatusCode::OK);
  let failures = failures.as_array().unwrap().clone();
  assert_eq!(failures.len(), 1);
  assert_eq!(failures[0]["event"]["kind"], "checkin_created");
  let id = failures[0]["failure_id"].as_str().unwrap().to_owned();
  let replay = format!("/admin/failures/{id}/replay");

  // Still offline: the entry survives a failed replay.
  let (status, _) = send(&h.app, Method::POST, &replay, None, Some(instructor())).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

  h.offline.store(false, Ordering::SeqCst);
  let (status, body) = send(&h.app, Method::POST, &replay, None, Some(instructor())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["result"], "applied");
  assert_eq!(counters(&h.app).await["excused"], 1);

  let (_, failures) =
    send(&h.app, Method::GET, "/admin/failures", None, Some(instructor())).await;
  assert!(failures.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failure_log_needs_instructor_auth() {
  let h = harness().await;
  let (status, _) = send(&h.app, Method::GET, "/admin/failures", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}
