//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{error, info, warn};

use crate::{
    error::TimerResult,
    state::{Session, Timer},
};

use super::responses::{status_for, ApiReply, ApiResponse, HealthResponse, SettingsRequest};

/// Build the reply for a finished control action
fn reply<T>(
    session: &Session,
    action: &str,
    result: TimerResult<T>,
    describe: impl FnOnce(&T) -> String,
) -> ApiReply {
    match result {
        Ok(value) => {
            let message = describe(&value);
            info!("{} endpoint called - {}", action, message);
            (StatusCode::OK, Json(ApiResponse::ok(message, session.snapshot())))
        }
        Err(e) => {
            if e.is_remote() {
                error!("{} failed: {}", action, e);
            } else {
                warn!("{} refused: {}", action, e);
            }
            (status_for(&e), Json(ApiResponse::error(&e, session.snapshot())))
        }
    }
}

fn describe_timer(verb: &'static str) -> impl FnOnce(&Timer) -> String {
    move |timer: &Timer| format!("{} timer #{}", verb, timer.id)
}

/// Handle POST /timer/start - Start a work phase from idle
pub async fn start_handler(State(session): State<Arc<Session>>) -> ApiReply {
    let result = session.start().await;
    reply(&session, "Start", result, describe_timer("Started"))
}

/// Handle POST /timer/pause
pub async fn pause_handler(State(session): State<Arc<Session>>) -> ApiReply {
    let result = session.pause().await;
    reply(&session, "Pause", result, describe_timer("Paused"))
}

/// Handle POST /timer/resume
pub async fn resume_handler(State(session): State<Arc<Session>>) -> ApiReply {
    let result = session.resume().await;
    reply(&session, "Resume", result, describe_timer("Resumed"))
}

/// Handle POST /timer/toggle - Play/pause button
pub async fn toggle_handler(State(session): State<Arc<Session>>) -> ApiReply {
    let result = session.toggle().await;
    reply(&session, "Toggle", result, |timer| {
        format!("Timer #{} is now {:?}", timer.id, timer.status)
    })
}

/// Handle POST /timer/skip - Jump to the next phase
pub async fn skip_handler(State(session): State<Arc<Session>>) -> ApiReply {
    let result = session.skip().await;
    reply(&session, "Skip", result, |timer| {
        format!(
            "Skipped to {} timer #{}",
            if timer.is_break { "break" } else { "work" },
            timer.id
        )
    })
}

/// Handle POST /timer/reset - Stop and return to idle
pub async fn reset_handler(State(session): State<Arc<Session>>) -> ApiReply {
    let result = session.reset().await;
    reply(&session, "Reset", result, |_| "Session reset".to_string())
}

/// Handle PUT /timer/settings - Change phase lengths for upcoming timers
pub async fn settings_handler(
    State(session): State<Arc<Session>>,
    Json(request): Json<SettingsRequest>,
) -> ApiReply {
    let result =
        session.update_settings(request.preset, request.work_minutes, request.break_minutes);
    reply(&session, "Settings", result, |policy| {
        format!(
            "Work {}m / break {}m",
            policy.work_seconds / 60,
            policy.break_seconds / 60
        )
    })
}

/// Handle DELETE /timer/error - Dismiss the last error
pub async fn clear_error_handler(State(session): State<Arc<Session>>) -> ApiReply {
    session.store().clear_error();
    reply(&session, "Clear error", Ok(()), |_| "Error cleared".to_string())
}

/// Handle GET /status - Current session snapshot
pub async fn status_handler(State(session): State<Arc<Session>>) -> ApiReply {
    (
        StatusCode::OK,
        Json(ApiResponse::ok("Current session", session.snapshot())),
    )
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
