//! One-second interval driving the session's local countdown

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::{
    task::{self, JoinHandle},
    time::{interval_at, Instant},
};
use tracing::{debug, error, info};

use crate::state::{session::Session, ticker::TickOutcome};

/// How ticks reach the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// A tokio interval task with the given period.
    Interval(Duration),
    /// The caller invokes `Session::tick`/`Session::step` itself. Arming only
    /// records that an interval would be running.
    Manual,
}

impl Default for TickSource {
    fn default() -> Self {
        TickSource::Interval(Duration::from_secs(1))
    }
}

enum Armed {
    Task(JoinHandle<()>),
    Manual,
}

/// Holds at most one armed interval.
pub struct IntervalSlot {
    source: TickSource,
    armed: Mutex<Option<Armed>>,
}

impl IntervalSlot {
    pub fn new(source: TickSource) -> Self {
        Self {
            source,
            armed: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Armed>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm a fresh interval for `session`, cancelling any previous one first.
    pub fn arm(&self, session: &Arc<Session>) {
        let mut armed = self.lock();
        if let Some(Armed::Task(handle)) = armed.take() {
            handle.abort();
        }

        *armed = Some(match self.source {
            TickSource::Interval(period) => {
                let weak = Arc::downgrade(session);
                Armed::Task(tokio::spawn(local_ticker_task(weak, period)))
            }
            TickSource::Manual => Armed::Manual,
        });
        debug!("Local ticker armed");
    }

    /// Cancel the armed interval, if any.
    pub fn disarm(&self) {
        if let Some(armed) = self.lock().take() {
            if let Armed::Task(handle) = armed {
                handle.abort();
            }
            debug!("Local ticker disarmed");
        }
    }

    /// Drop the slot's claim without aborting. Used from inside the interval
    /// task itself when it is about to exit; a task that was already
    /// replaced by a newer arm leaves the newer handle alone.
    pub fn release(&self) {
        let mut armed = self.lock();
        let owned = match &*armed {
            Some(Armed::Task(handle)) => task::try_id() == Some(handle.id()),
            Some(Armed::Manual) => true,
            None => false,
        };
        if owned {
            armed.take();
        }
    }

    pub fn is_armed(&self) -> bool {
        match &*self.lock() {
            Some(Armed::Task(handle)) => !handle.is_finished(),
            Some(Armed::Manual) => true,
            None => false,
        }
    }
}

impl Drop for IntervalSlot {
    fn drop(&mut self) {
        if let Some(Armed::Task(handle)) = self.lock().take() {
            handle.abort();
        }
    }
}

/// Tick the session once per `period` until it stops ticking.
///
/// Holds only a weak reference so a dropped session ends the task. On
/// expiry the phase transition runs as its own task, because the
/// transition re-arms the slot and would otherwise cancel itself.
pub async fn local_ticker_task(session: Weak<Session>, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);

    loop {
        interval.tick().await;

        let Some(session) = session.upgrade() else {
            break;
        };

        match session.tick() {
            TickOutcome::Advanced(seconds) => {
                debug!("Tick: {}s", seconds);
            }
            TickOutcome::Expired { timer_id } => {
                info!("Timer #{} reached zero, advancing phase", timer_id);
                tokio::spawn(async move {
                    if let Err(e) = session.complete_phase().await {
                        error!("Phase transition after expiry failed: {}", e);
                    }
                });
                break;
            }
            TickOutcome::Inactive => break,
        }
    }
}
