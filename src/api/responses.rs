//! API response structures

use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::TimerError,
    state::{DurationPreset, SessionSnapshot},
};

/// Envelope returned by every control endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub session: SessionSnapshot,
}

impl ApiResponse {
    pub fn new(status: &str, message: String, session: SessionSnapshot) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            session,
        }
    }

    pub fn ok(message: impl Into<String>, session: SessionSnapshot) -> Self {
        Self::new("ok", message.into(), session)
    }

    pub fn error(err: &TimerError, session: SessionSnapshot) -> Self {
        Self::new("error", err.to_string(), session)
    }
}

/// Handler result: the envelope plus the HTTP status to send it with
pub type ApiReply = (StatusCode, Json<ApiResponse>);

/// HTTP status for a failed control action
pub fn status_for(err: &TimerError) -> StatusCode {
    match err {
        TimerError::MissingCredentials => StatusCode::UNAUTHORIZED,
        TimerError::Transport(_) | TimerError::Rejected { .. } | TimerError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
        TimerError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
        TimerError::AlreadyCompleted(_)
        | TimerError::NoActiveTimer
        | TimerError::NotRunning(_)
        | TimerError::NotPaused(_)
        | TimerError::AlreadyActive
        | TimerError::TransitionInFlight => StatusCode::CONFLICT,
    }
}

/// Body of `PUT /timer/settings`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub preset: DurationPreset,
    pub work_minutes: Option<u64>,
    pub break_minutes: Option<u64>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
