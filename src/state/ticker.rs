//! Local per-second countdown that runs between server round-trips

use serde::Serialize;

use super::timer::Timer;

/// Where the local countdown stands.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TickerState {
    /// No active timer.
    Idle,
    /// Active timer is running and the one-second interval is armed.
    #[serde(rename_all = "camelCase")]
    Ticking {
        timer_id: i64,
        seconds: u64,
        counts_down: bool,
    },
    /// Active timer is paused, completed, or has just expired locally.
    #[serde(rename_all = "camelCase")]
    Halted { timer_id: i64, seconds: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The displayed value moved by one second.
    Advanced(u64),
    /// The countdown hit zero on this tick. Reported once per expiry.
    Expired { timer_id: i64 },
    /// Nothing is ticking.
    Inactive,
}

#[derive(Debug, Clone)]
pub struct LocalTicker {
    state: TickerState,
    /// Store revision of the record last adopted.
    seen_revision: Option<u64>,
    /// Timer that hit zero locally and is waiting for its phase transition.
    expired: Option<i64>,
}

impl Default for LocalTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTicker {
    pub fn new() -> Self {
        Self {
            state: TickerState::Idle,
            seen_revision: None,
            expired: None,
        }
    }

    pub fn state(&self) -> TickerState {
        self.state
    }

    pub fn is_ticking(&self) -> bool {
        matches!(self.state, TickerState::Ticking { .. })
    }

    pub fn display_seconds(&self) -> u64 {
        match self.state {
            TickerState::Idle => 0,
            TickerState::Ticking { seconds, .. } | TickerState::Halted { seconds, .. } => seconds,
        }
    }

    /// Adopt the server's view of the active timer.
    ///
    /// `revision` counts the server responses written into the active slot.
    /// Every new revision replaces the local count outright, even when the
    /// record reads the same as before. The one exception is a timer that
    /// already expired locally and is still reported running: it stays
    /// halted at zero so the expiry cannot fire twice. Returns whether the
    /// ticker was re-seeded.
    pub fn resync(&mut self, active: Option<&Timer>, revision: u64) -> bool {
        if self.seen_revision == Some(revision) {
            return false;
        }
        self.seen_revision = Some(revision);

        let Some(timer) = active else {
            self.state = TickerState::Idle;
            self.expired = None;
            return true;
        };

        if self.expired == Some(timer.id) && timer.is_running() {
            return false;
        }
        self.expired = None;

        let seconds = timer.seed_seconds();
        self.state = if timer.is_running() {
            TickerState::Ticking {
                timer_id: timer.id,
                seconds,
                counts_down: timer.timer_type.counts_down(),
            }
        } else {
            TickerState::Halted {
                timer_id: timer.id,
                seconds,
            }
        };
        true
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TickOutcome {
        let TickerState::Ticking {
            timer_id,
            seconds,
            counts_down,
        } = self.state
        else {
            return TickOutcome::Inactive;
        };

        if !counts_down {
            let seconds = seconds.saturating_add(1);
            self.state = TickerState::Ticking {
                timer_id,
                seconds,
                counts_down,
            };
            return TickOutcome::Advanced(seconds);
        }

        let seconds = seconds.saturating_sub(1);
        if seconds == 0 {
            self.state = TickerState::Halted {
                timer_id,
                seconds: 0,
            };
            self.expired = Some(timer_id);
            return TickOutcome::Expired { timer_id };
        }

        self.state = TickerState::Ticking {
            timer_id,
            seconds,
            counts_down,
        };
        TickOutcome::Advanced(seconds)
    }

    /// Stop ticking but keep the displayed value.
    pub fn halt(&mut self) {
        if let TickerState::Ticking {
            timer_id, seconds, ..
        } = self.state
        {
            self.state = TickerState::Halted { timer_id, seconds };
        }
    }
}
