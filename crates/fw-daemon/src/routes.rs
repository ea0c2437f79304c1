//! Axum router and all HTTP handlers for fw-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are thin: extract, call one engine operation,
//! map `EngineError` onto a status code.

use std::{convert::Infallible, sync::Arc};

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use fw_integrity::{CheckOutcome, TelemetrySample};
use fw_roster::{LeaderboardEntry, RollCallView, DEFAULT_LEADERBOARD_LIMIT};
use fw_schemas::{EngineError, Shift, ShiftType};
use fw_shift::{
    ClockInOutcome, ClockInRequest, ClockOutOutcome, ClockOutRequest, CreateShiftRequest,
    ShiftView,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        ErrorResponse, HealthResponse, LeaderboardQuery, ReasonRequest, ResetResponse,
        RollCallQuery, TripRequest, ViolationCountResponse,
    },
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/shifts", post(create_shift))
        .route("/v1/shifts/:id", get(get_shift))
        .route("/v1/shifts/:id/clock-in", post(clock_in))
        .route("/v1/shifts/:id/begin-work", post(begin_work))
        .route("/v1/shifts/:id/breaks/start", post(start_break))
        .route("/v1/shifts/:id/breaks/end", post(end_break))
        .route("/v1/shifts/:id/clock-out", post(clock_out))
        .route("/v1/shifts/:id/cancel", post(cancel))
        .route("/v1/shifts/:id/no-show", post(mark_no_show))
        .route("/v1/shifts/:id/trips", post(record_trip))
        .route("/v1/drivers/:id/shifts", get(driver_shifts))
        .route("/v1/roll-call", get(roll_call))
        .route("/v1/leaderboard", get(leaderboard))
        .route("/v1/integrity/check", post(integrity_check))
        .route("/v1/integrity/:driver_id", get(violation_count))
        .route("/v1/integrity/:driver_id/reset", post(reset_violations))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// `EngineError` at the HTTP edge.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorResponse {
            code: self.0.code().to_string(),
            message: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(v)| v).map_err(|e| {
        ApiError(EngineError::Validation(format!(
            "invalid request body: {}",
            e.body_text()
        )))
    })
}

/// Optional JSON body: an empty body is `None`, anything else must parse.
fn optional_json_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| {
        ApiError(EngineError::Validation(format!(
            "invalid request body: {e}"
        )))
    })
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query.map(|Query(v)| v).map_err(|e| {
        ApiError(EngineError::Validation(format!(
            "invalid query string: {}",
            e.body_text()
        )))
    })
}

fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, EngineError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EngineError::Validation(format!("query parameter {name} is required"))),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| EngineError::Validation(format!("date must be YYYY-MM-DD (got {raw:?})")))
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// Shifts
// ---------------------------------------------------------------------------

pub(crate) async fn create_shift(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<CreateShiftRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Shift>)> {
    let req = json_body(payload)?;
    let shift = st.lifecycle.create_shift(req).await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

pub(crate) async fn get_shift(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ShiftView>> {
    Ok(Json(st.lifecycle.get_shift(&id).await?))
}

pub(crate) async fn clock_in(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ClockInRequest>, JsonRejection>,
) -> ApiResult<Json<ClockInOutcome>> {
    let req = json_body(payload)?;
    Ok(Json(st.lifecycle.clock_in(&id, req).await?))
}

pub(crate) async fn begin_work(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Shift>> {
    Ok(Json(st.lifecycle.begin_work(&id).await?))
}

pub(crate) async fn start_break(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Shift>> {
    let reason = optional_json_body::<ReasonRequest>(&body)?.and_then(|r| r.reason);
    Ok(Json(st.lifecycle.start_break(&id, reason).await?))
}

pub(crate) async fn end_break(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Shift>> {
    Ok(Json(st.lifecycle.end_break(&id).await?))
}

pub(crate) async fn clock_out(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ClockOutRequest>, JsonRejection>,
) -> ApiResult<Json<ClockOutOutcome>> {
    let req = json_body(payload)?;
    Ok(Json(st.lifecycle.clock_out(&id, req).await?))
}

pub(crate) async fn cancel(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Shift>> {
    let reason = optional_json_body::<ReasonRequest>(&body)?.and_then(|r| r.reason);
    Ok(Json(st.lifecycle.cancel(&id, reason).await?))
}

pub(crate) async fn mark_no_show(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Shift>> {
    Ok(Json(st.lifecycle.mark_no_show(&id).await?))
}

pub(crate) async fn record_trip(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TripRequest>, JsonRejection>,
) -> ApiResult<Json<Shift>> {
    let req = json_body(payload)?;
    Ok(Json(st.lifecycle.record_trip(&id, req.revenue_cents).await?))
}

pub(crate) async fn driver_shifts(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Shift>>> {
    Ok(Json(st.lifecycle.shifts_for_driver(&id).await?))
}

// ---------------------------------------------------------------------------
// Roster views
// ---------------------------------------------------------------------------

pub(crate) async fn roll_call(
    State(st): State<Arc<AppState>>,
    query: Result<Query<RollCallQuery>, QueryRejection>,
) -> ApiResult<Json<RollCallView>> {
    let q = query_params(query)?;
    let shift_type = ShiftType::parse(required("shift_type", &q.shift_type)?)?;
    let date = parse_date(required("date", &q.date)?)?;
    Ok(Json(st.roster.get_roll_call(shift_type, date).await?))
}

pub(crate) async fn leaderboard(
    State(st): State<Arc<AppState>>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let q = query_params(query)?;
    let date = parse_date(required("date", &q.date)?)?;
    let shift_type = match q.shift_type.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(ShiftType::parse(raw)?),
        _ => None,
    };
    let limit = q.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    if limit == 0 {
        return Err(EngineError::Validation("limit must be at least 1".to_string()).into());
    }
    Ok(Json(st.roster.get_leaderboard(date, shift_type, limit).await?))
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

pub(crate) async fn integrity_check(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<TelemetrySample>, JsonRejection>,
) -> ApiResult<Json<CheckOutcome>> {
    let sample = json_body(payload)?;
    let outcome = st.integrity.check(sample).await?;
    if let Some(alert) = outcome.alert.clone() {
        info!(
            driver_id = %alert.driver_id,
            incident_id = ?outcome.incident_id,
            "integrity alert published"
        );
        st.publish_alert(outcome.incident_id.clone(), alert);
    }
    Ok(Json(outcome))
}

pub(crate) async fn violation_count(
    State(st): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> ApiResult<Json<ViolationCountResponse>> {
    let count = st.integrity.violation_count(&driver_id).await?;
    Ok(Json(ViolationCountResponse {
        driver_id,
        count,
        threshold: st.integrity.config().threshold_checks(),
    }))
}

pub(crate) async fn reset_violations(
    State(st): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> ApiResult<Json<ResetResponse>> {
    st.integrity.reset_violation_counter(&driver_id).await?;
    Ok(Json(ResetResponse {
        driver_id,
        reset: true,
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::IntegrityAlert { .. } => "integrity_alert",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
