//! Timer entity as cached from the timer resource, plus its wire decoding

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TimerError, TimerResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerType {
    Stopwatch,
    Countdown,
    Pomodoro,
}

impl TimerType {
    /// Stopwatches count up forever, everything else counts down.
    pub fn counts_down(&self) -> bool {
        !matches!(self, TimerType::Stopwatch)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerStatus {
    Running,
    Paused,
    Completed,
}

/// A server-owned timer record. Only produced by [`Timer::from_payload`], so
/// every field here has been validated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: i64,
    pub timer_type: TimerType,
    pub title: Option<String>,
    pub duration_seconds: Option<u64>,
    /// Server snapshot of time left at the last read.
    pub remaining_seconds: Option<u64>,
    pub is_break: bool,
    pub status: TimerStatus,
    pub task_ids: Vec<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of a create request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTimer {
    pub timer_type: TimerType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    pub is_break: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<i64>,
}

/// Raw shape of a timer as the backend sends it. Everything is optional
/// here; [`Timer::from_payload`] decides what is acceptable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerPayload {
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub task_ids: Option<Vec<i64>>,
    pub title: Option<String>,
    pub timer_type: Option<TimerType>,
    pub duration_seconds: Option<i64>,
    pub remaining_seconds: Option<i64>,
    pub is_paused: Option<bool>,
    pub is_completed: Option<bool>,
    pub is_break: Option<bool>,
    pub status: Option<TimerStatus>,
    pub created_at: Option<String>,
}

impl Timer {
    /// Validate a decoded payload into a timer record.
    pub fn from_payload(payload: TimerPayload) -> TimerResult<Self> {
        let id = payload
            .id
            .ok_or_else(|| TimerError::Decode("missing id".to_string()))?;
        let timer_type = payload
            .timer_type
            .ok_or_else(|| TimerError::Decode(format!("timer #{id} has no timerType")))?;

        // Older records only carry the boolean flags.
        let status = match (payload.status, payload.is_completed, payload.is_paused) {
            (Some(status), _, _) => status,
            (None, Some(true), _) => TimerStatus::Completed,
            (None, _, Some(true)) => TimerStatus::Paused,
            (None, Some(false), Some(false)) => TimerStatus::Running,
            _ => return Err(TimerError::Decode(format!("timer #{id} has no status"))),
        };

        let duration_seconds = match payload.duration_seconds {
            Some(d) if d < 0 => {
                return Err(TimerError::Decode(format!(
                    "timer #{id} has negative duration {d}"
                )))
            }
            other => other.map(|d| d as u64),
        };
        // The server may report a slightly negative remainder once a phase overran.
        let remaining_seconds = payload.remaining_seconds.map(|r| r.max(0) as u64);

        if timer_type.counts_down() && duration_seconds.is_none() && remaining_seconds.is_none() {
            return Err(TimerError::Decode(format!(
                "timer #{id} counts down but has no duration"
            )));
        }

        let created_at = payload
            .created_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Self {
            id,
            timer_type,
            title: payload.title,
            duration_seconds,
            remaining_seconds,
            is_break: payload.is_break.unwrap_or(false),
            status,
            task_ids: payload.task_ids.unwrap_or_default(),
            created_at,
        })
    }

    /// Decode a single timer from a JSON body.
    pub fn from_json(body: &[u8]) -> TimerResult<Self> {
        let payload: TimerPayload =
            serde_json::from_slice(body).map_err(|e| TimerError::Decode(e.to_string()))?;
        Self::from_payload(payload)
    }

    /// Decode a JSON array of timers, failing on the first invalid entry.
    pub fn list_from_json(body: &[u8]) -> TimerResult<Vec<Self>> {
        let payloads: Vec<TimerPayload> =
            serde_json::from_slice(body).map_err(|e| TimerError::Decode(e.to_string()))?;
        payloads.into_iter().map(Self::from_payload).collect()
    }

    pub fn is_completed(&self) -> bool {
        self.status == TimerStatus::Completed
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Value the local ticker starts from when it adopts this record.
    pub fn seed_seconds(&self) -> u64 {
        if self.timer_type.counts_down() {
            self.remaining_seconds
                .or(self.duration_seconds)
                .unwrap_or(0)
        } else {
            0
        }
    }
}

/// Accepts RFC 3339 as well as the zone-less `LocalDateTime` form some
/// backends emit; the latter is read as UTC.
fn parse_timestamp(raw: &str) -> TimerResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| TimerError::Decode(format!("invalid createdAt '{raw}': {e}")))
}

/// The most recently created timer that is not completed.
pub fn pick_active(timers: &[Timer]) -> Option<&Timer> {
    timers
        .iter()
        .filter(|t| !t.is_completed())
        .max_by_key(|t| (t.created_at, t.id))
}
