//! The reqwest timer client against a mock timer resource served by axum.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use study_session::{
    error::TimerError,
    services::{HttpTimerBackend, StaticToken, TimerBackend},
    state::{NewTimer, TimerStatus, TimerType},
};

const TOKEN: &str = "test-token";

/// Requests seen by the mock, as `"METHOD path"`.
type Seen = Arc<Mutex<Vec<String>>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

fn record(id: i64, status: &str, remaining: i64, is_break: bool) -> Value {
    json!({
        "id": id,
        "userId": "user-1",
        "taskIds": [],
        "title": "Work session",
        "timerType": "POMODORO",
        "durationSeconds": 1500,
        "remainingSeconds": remaining,
        "isBreak": is_break,
        "status": status,
        "createdAt": "2024-03-01T09:00:00"
    })
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid token" }))).into_response()
}

async fn create(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    seen.lock().unwrap().push(format!("POST / {}", body));
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut created = record(1, "RUNNING", body["durationSeconds"].as_i64().unwrap_or(0), body["isBreak"].as_bool().unwrap_or(false));
    created["durationSeconds"] = body["durationSeconds"].clone();
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn list_active(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    seen.lock().unwrap().push("GET /active".to_string());
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([record(1, "RUNNING", 842, false), record(2, "PAUSED", 100, true)])).into_response()
}

async fn list_breaks(State(seen): State<Seen>) -> Response {
    seen.lock().unwrap().push("GET /breaks".to_string());
    Json(json!([record(2, "PAUSED", 100, true)])).into_response()
}

async fn list_all(State(seen): State<Seen>) -> Response {
    seen.lock().unwrap().push("GET /".to_string());
    Json(json!([{ "id": 3, "timerType": "POMODORO", "status": "BOGUS" }])).into_response()
}

async fn get_one(State(seen): State<Seen>, Path(id): Path<i64>) -> Response {
    seen.lock().unwrap().push(format!("GET /{id}"));
    match id {
        1 => Json(record(1, "RUNNING", 700, false)).into_response(),
        // Not JSON at all.
        2 => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("Timer not found with id {id}") })),
        )
            .into_response(),
    }
}

async fn for_task(State(seen): State<Seen>, Path(task_id): Path<i64>) -> Response {
    seen.lock().unwrap().push(format!("GET /task/{task_id}"));
    Json(json!([])).into_response()
}

async fn action(State(seen): State<Seen>, Path((id, action)): Path<(i64, String)>) -> Response {
    seen.lock().unwrap().push(format!("PUT /{id}/{action}"));
    match (id, action.as_str()) {
        (1, "pause") => Json(record(1, "PAUSED", 1200, false)).into_response(),
        (1, "resume") => Json(record(1, "RUNNING", 1200, false)).into_response(),
        (1, "stop") => Json(record(1, "COMPLETED", 0, false)).into_response(),
        // Error without a message body.
        (_, _) => (StatusCode::INTERNAL_SERVER_ERROR, "").into_response(),
    }
}

async fn remove(State(seen): State<Seen>, Path(id): Path<i64>) -> StatusCode {
    seen.lock().unwrap().push(format!("DELETE /{id}"));
    StatusCode::NO_CONTENT
}

async fn spawn_mock() -> (SocketAddr, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/api/timer", post(create).get(list_all))
        .route("/api/timer/active", get(list_active))
        .route("/api/timer/breaks", get(list_breaks))
        .route("/api/timer/task/:task_id", get(for_task))
        .route("/api/timer/:id", get(get_one).delete(remove))
        .route("/api/timer/:id/:action", put(action))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn client(addr: SocketAddr, token: Option<&str>) -> HttpTimerBackend {
    HttpTimerBackend::new(
        format!("http://{addr}/api/timer/"),
        Arc::new(StaticToken::new(token.map(str::to_string))),
    )
}

#[tokio::test]
async fn create_posts_the_new_timer_and_decodes_the_record() {
    let (addr, seen) = spawn_mock().await;
    let backend = client(addr, Some(TOKEN));

    let timer = backend
        .create(&NewTimer {
            timer_type: TimerType::Pomodoro,
            title: "Break session".to_string(),
            duration_seconds: Some(300),
            is_break: true,
            task_ids: vec![],
        })
        .await
        .unwrap();

    assert_eq!(timer.status, TimerStatus::Running);
    assert!(timer.is_break);
    assert_eq!(timer.duration_seconds, Some(300));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains(r#""timerType":"POMODORO""#));
    assert!(seen[0].contains(r#""isBreak":true"#));
}

#[tokio::test]
async fn lifecycle_calls_hit_the_documented_paths() {
    let (addr, seen) = spawn_mock().await;
    let backend = client(addr, Some(TOKEN));

    assert_eq!(backend.list_active().await.unwrap().len(), 2);
    assert_eq!(backend.list_breaks().await.unwrap()[0].id, 2);
    assert_eq!(backend.get(1).await.unwrap().remaining_seconds, Some(700));
    assert!(backend.list_for_task(9).await.unwrap().is_empty());
    assert_eq!(backend.pause(1).await.unwrap().status, TimerStatus::Paused);
    assert_eq!(backend.resume(1).await.unwrap().status, TimerStatus::Running);
    assert_eq!(backend.stop(1).await.unwrap().status, TimerStatus::Completed);
    backend.delete(1).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "GET /active",
            "GET /breaks",
            "GET /1",
            "GET /task/9",
            "PUT /1/pause",
            "PUT /1/resume",
            "PUT /1/stop",
            "DELETE /1",
        ]
    );
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let (addr, _) = spawn_mock().await;
    let backend = client(addr, Some(TOKEN));

    assert_eq!(
        backend.get(99).await.unwrap_err(),
        TimerError::Rejected {
            status: 404,
            message: "Timer not found with id 99".to_string(),
        }
    );
}

#[tokio::test]
async fn missing_message_falls_back_per_operation() {
    let (addr, _) = spawn_mock().await;
    let backend = client(addr, Some(TOKEN));

    assert_eq!(
        backend.pause(5).await.unwrap_err(),
        TimerError::Rejected {
            status: 500,
            message: "Failed to pause timer".to_string(),
        }
    );
    assert_eq!(
        backend.stop(5).await.unwrap_err().to_string(),
        "Failed to stop timer"
    );
}

#[tokio::test]
async fn wrong_token_is_rejected_by_the_server() {
    let (addr, _) = spawn_mock().await;
    let backend = client(addr, Some("stale"));

    assert_eq!(
        backend.list_active().await.unwrap_err(),
        TimerError::Rejected {
            status: 401,
            message: "Invalid token".to_string(),
        }
    );
}

#[tokio::test]
async fn no_token_fails_before_any_request() {
    let (addr, seen) = spawn_mock().await;
    let backend = client(addr, None);

    assert_eq!(
        backend.list_active().await.unwrap_err(),
        TimerError::MissingCredentials
    );
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let (addr, _) = spawn_mock().await;
    let backend = client(addr, Some(TOKEN));

    assert!(matches!(backend.get(2).await, Err(TimerError::Decode(_))));
    assert!(matches!(backend.list_all().await, Err(TimerError::Decode(_))));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = client(addr, Some(TOKEN));
    assert!(matches!(
        backend.list_active().await,
        Err(TimerError::Transport(_))
    ));
}
