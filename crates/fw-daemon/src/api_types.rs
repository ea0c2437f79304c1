//! Request and response types for the fw-daemon HTTP endpoints.
//!
//! Engine records (`Shift`, `ShiftView`, `RollCallView`, ...) are returned as
//! they are; only the envelopes that exist purely for the wire live here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// "NOT_FOUND" | "VALIDATION" | "CONFLICT" | "INFRASTRUCTURE"
    pub code: String,
    pub message: String,
    /// true only for infrastructure failures; the caller may retry as-is.
    pub retryable: bool,
}

// ---------------------------------------------------------------------------
// Shift transitions
// ---------------------------------------------------------------------------

/// Optional body of `breaks/start` and `cancel`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub revenue_cents: i64,
}

// ---------------------------------------------------------------------------
// Roster queries
// ---------------------------------------------------------------------------

/// Query parameters arrive as strings so that a bad value becomes a
/// `VALIDATION` body instead of a bare extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollCallQuery {
    pub shift_type: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub date: Option<String>,
    pub shift_type: Option<String>,
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// /v1/integrity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationCountResponse {
    pub driver_id: String,
    pub count: u64,
    /// Consecutive violating checks that trigger an alert.
    pub threshold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub driver_id: String,
    pub reset: bool,
}
