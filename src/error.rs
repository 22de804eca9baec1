//! Error taxonomy shared by the timer client, the session and the control API

/// Errors raised while talking to the timer resource or driving the session.
///
/// Every variant is `Clone` so the last failure can be kept in the store's
/// error slot and still be returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// No bearer credential is configured.
    #[error("No authentication token available")]
    MissingCredentials,

    /// The request never produced a response (connect, DNS, TLS, body read).
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The server answered 2xx but the body is not a valid timer record.
    #[error("Invalid timer payload: {0}")]
    Decode(String),

    #[error("Timer #{0} is already completed")]
    AlreadyCompleted(i64),

    #[error("No active timer")]
    NoActiveTimer,

    #[error("Timer #{0} is not running")]
    NotRunning(i64),

    #[error("Timer #{0} is not paused")]
    NotPaused(i64),

    #[error("A timer is already active")]
    AlreadyActive,

    #[error("A phase transition is already in progress")]
    TransitionInFlight,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl TimerError {
    /// Whether the error comes from the backend rather than local state checks.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            TimerError::Transport(_) | TimerError::Rejected { .. } | TimerError::Decode(_)
        )
    }
}

impl From<reqwest::Error> for TimerError {
    fn from(err: reqwest::Error) -> Self {
        TimerError::Transport(err.to_string())
    }
}

pub type TimerResult<T> = Result<T, TimerError>;
