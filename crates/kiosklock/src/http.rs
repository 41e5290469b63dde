//! The HTTP adapter: the station's boundary operations as JSON routes.
//!
//! This layer makes no decisions. Each handler locks the shared station,
//! calls the corresponding facade method, and maps the outcome onto a
//! status code and body:
//!
//! | route              | op            | statuses            |
//! |--------------------|---------------|---------------------|
//! | `POST /scan`       | scan          | 200 (always)        |
//! | `POST /webhook`    | webhook       | 200, 403            |
//! | `POST /admin/reset`| admin reset   | 200, 400, 401       |
//! | `GET  /stats`      | stats         | 200                 |
//! | `POST /relock`     | forced relock | 200 (always)        |
//! | `GET  /healthz`    | liveness      | 200                 |
//!
//! Scan rejections are data, not transport errors — the scanner UI reads
//! the reason out of a 200 body. The single `Mutex` is the concurrency
//! model: every request is processed to completion, store rewrite
//! included, before the next one starts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kiosklock_admin::AdminError;
use kiosklock_protocol::{
    AdminResetRequest, BatchId, ScanRequest, WebhookNotification,
};
use kiosklock_session::LockScreen;
use serde::{Deserialize, Serialize};

use crate::{KioskError, Station};

/// The station, shared across request handlers.
pub type SharedStation<S> = Arc<Mutex<Station<S>>>;

/// Builds the router exposing every boundary operation.
pub fn router<S: LockScreen>(station: SharedStation<S>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/scan", post(scan::<S>))
        .route("/webhook", post(webhook::<S>))
        .route("/admin/reset", post(admin_reset::<S>))
        .route("/stats", get(stats::<S>))
        .route("/relock", post(relock::<S>))
        .with_state(station)
}

/// Error body for non-200 responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ErrorBody {
    fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Locks the station, recovering from poisoning.
///
/// A poisoned mutex means an earlier request panicked mid-operation.
/// The controller relocks on every ambiguity, so the inner state is
/// still the safest thing we have — better to keep serving than to
/// wedge the kiosk.
fn lock<S: LockScreen>(
    station: &SharedStation<S>,
) -> MutexGuard<'_, Station<S>> {
    station.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn healthz() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn scan<S: LockScreen>(
    State(station): State<SharedStation<S>>,
    Json(req): Json<ScanRequest>,
) -> Response {
    let response = lock(&station).scan(&req.credential);
    (StatusCode::OK, Json(response)).into_response()
}

async fn webhook<S: LockScreen>(
    State(station): State<SharedStation<S>>,
    Json(note): Json<WebhookNotification>,
) -> Response {
    match lock(&station).webhook(&note) {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(err) => {
            (StatusCode::FORBIDDEN, Json(ErrorBody::new(err)))
                .into_response()
        }
    }
}

async fn admin_reset<S: LockScreen>(
    State(station): State<SharedStation<S>>,
    Json(req): Json<AdminResetRequest>,
) -> Response {
    match lock(&station).admin_reset(&req) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            let status = match &err {
                KioskError::Admin(AdminError::Unauthorized) => {
                    StatusCode::UNAUTHORIZED
                }
                KioskError::Status(_) | KioskError::InvalidReset(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ErrorBody::new(err))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    batch: Option<String>,
}

async fn stats<S: LockScreen>(
    State(station): State<SharedStation<S>>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let batch = query.batch.map(BatchId);
    let report = lock(&station).stats(batch.as_ref());
    (StatusCode::OK, Json(report)).into_response()
}

async fn relock<S: LockScreen>(
    State(station): State<SharedStation<S>>,
) -> Response {
    let report = lock(&station).force_relock();
    (StatusCode::OK, Json(report)).into_response()
}
