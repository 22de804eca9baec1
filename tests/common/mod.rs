#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use tokio::sync::Notify;

use study_session::{
    error::{TimerError, TimerResult},
    services::{PhaseNotifier, TimerBackend},
    state::{NewTimer, Session, SessionOptions, StudyContext, Timer, TimerStatus, TimerType},
    tasks::TickSource,
};

/// Backend operations that can be made to fail or to block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    ListActive,
    ListForTask,
    Get,
    Pause,
    Resume,
    Stop,
    Delete,
}

/// Holds one call of `op` until [`Gate::release`].
pub struct Gate {
    pub op: Op,
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory timer resource. Remaining time only moves when the test
/// advances the server clock.
#[derive(Default)]
pub struct FakeBackend {
    timers: Mutex<Vec<Timer>>,
    next_id: Mutex<i64>,
    failures: Mutex<HashMap<Op, TimerError>>,
    gate: Mutex<Option<Arc<Gate>>>,
    creates: AtomicUsize,
    stops: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: Mutex::new(100),
            ..Self::default()
        })
    }

    /// Seed a timer as if persisted by an earlier run.
    pub fn insert(&self, timer: Timer) {
        self.timers.lock().unwrap().push(timer);
    }

    pub fn timers(&self) -> Vec<Timer> {
        self.timers.lock().unwrap().clone()
    }

    pub fn timer(&self, id: i64) -> Option<Timer> {
        self.timers().into_iter().find(|t| t.id == id)
    }

    pub fn non_completed(&self) -> Vec<Timer> {
        self.timers()
            .into_iter()
            .filter(|t| t.status != TimerStatus::Completed)
            .collect()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Make every call of `op` fail with `err` until cleared.
    pub fn fail(&self, op: Op, err: TimerError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn heal(&self, op: Op) {
        self.failures.lock().unwrap().remove(&op);
    }

    /// Block the next call of `op` until the returned gate is released.
    pub fn hold(&self, op: Op) -> Arc<Gate> {
        let gate = Arc::new(Gate {
            op,
            entered: Notify::new(),
            release: Notify::new(),
        });
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Let `seconds` of server time pass for running countdowns.
    pub fn advance_clock(&self, seconds: u64) {
        for timer in self.timers.lock().unwrap().iter_mut() {
            if timer.status == TimerStatus::Running && timer.timer_type.counts_down() {
                timer.remaining_seconds = timer.remaining_seconds.map(|r| r.saturating_sub(seconds));
            }
        }
    }

    async fn enter(&self, op: Op) -> TimerResult<()> {
        let gate = {
            let mut slot = self.gate.lock().unwrap();
            match slot.as_ref() {
                Some(gate) if gate.op == op => slot.take(),
                _ => None,
            }
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        match self.failures.lock().unwrap().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn update(&self, id: i64, status: TimerStatus) -> TimerResult<Timer> {
        let mut timers = self.timers.lock().unwrap();
        let timer = timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TimerError::Rejected {
                status: 404,
                message: format!("Timer not found with id {id}"),
            })?;
        if timer.status == TimerStatus::Completed {
            return Err(TimerError::Rejected {
                status: 400,
                message: "Timer is already completed".to_string(),
            });
        }
        timer.status = status;
        Ok(timer.clone())
    }
}

#[async_trait]
impl TimerBackend for FakeBackend {
    async fn create(&self, new_timer: &NewTimer) -> TimerResult<Timer> {
        self.enter(Op::Create).await?;
        self.creates.fetch_add(1, Ordering::SeqCst);

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let timer = Timer {
            id,
            timer_type: new_timer.timer_type,
            title: Some(new_timer.title.clone()),
            duration_seconds: new_timer.duration_seconds,
            remaining_seconds: new_timer.duration_seconds,
            is_break: new_timer.is_break,
            status: TimerStatus::Running,
            task_ids: new_timer.task_ids.clone(),
            created_at: Some(base_time() + ChronoDuration::seconds(id)),
        };
        self.timers.lock().unwrap().push(timer.clone());
        Ok(timer)
    }

    async fn list_active(&self) -> TimerResult<Vec<Timer>> {
        self.enter(Op::ListActive).await?;
        Ok(self.non_completed())
    }

    async fn list_breaks(&self) -> TimerResult<Vec<Timer>> {
        Ok(self.timers().into_iter().filter(|t| t.is_break).collect())
    }

    async fn get(&self, id: i64) -> TimerResult<Timer> {
        self.enter(Op::Get).await?;
        self.timer(id).ok_or_else(|| TimerError::Rejected {
            status: 404,
            message: format!("Timer not found with id {id}"),
        })
    }

    async fn list_all(&self) -> TimerResult<Vec<Timer>> {
        Ok(self.timers())
    }

    async fn list_for_task(&self, task_id: i64) -> TimerResult<Vec<Timer>> {
        self.enter(Op::ListForTask).await?;
        Ok(self
            .timers()
            .into_iter()
            .filter(|t| t.task_ids.contains(&task_id))
            .collect())
    }

    async fn pause(&self, id: i64) -> TimerResult<Timer> {
        self.enter(Op::Pause).await?;
        self.update(id, TimerStatus::Paused)
    }

    async fn resume(&self, id: i64) -> TimerResult<Timer> {
        self.enter(Op::Resume).await?;
        self.update(id, TimerStatus::Running)
    }

    async fn stop(&self, id: i64) -> TimerResult<Timer> {
        self.enter(Op::Stop).await?;
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.update(id, TimerStatus::Completed)
    }

    async fn delete(&self, id: i64) -> TimerResult<()> {
        self.enter(Op::Delete).await?;
        self.timers.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}

/// Counts phase notifications; can be told to fail.
#[derive(Default)]
pub struct CountingNotifier {
    pub calls: AtomicUsize,
    pub broken: bool,
}

impl PhaseNotifier for CountingNotifier {
    fn phase_started(&self, _timer: &Timer) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            Err("no audio device".to_string())
        } else {
            Ok(())
        }
    }
}

pub fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn pomodoro(id: i64, status: TimerStatus, remaining: u64, is_break: bool) -> Timer {
    Timer {
        id,
        timer_type: TimerType::Pomodoro,
        title: Some("Work session".to_string()),
        duration_seconds: Some(if is_break { 300 } else { 1500 }),
        remaining_seconds: Some(remaining),
        is_break,
        status,
        task_ids: vec![],
        created_at: Some(base_time() + ChronoDuration::seconds(id)),
    }
}

/// A session ticked by hand.
pub fn manual_session(
    backend: &Arc<FakeBackend>,
    notifier: &Arc<CountingNotifier>,
) -> Arc<Session> {
    manual_session_with(backend, notifier, StudyContext::default())
}

pub fn manual_session_with(
    backend: &Arc<FakeBackend>,
    notifier: &Arc<CountingNotifier>,
    context: StudyContext,
) -> Arc<Session> {
    Session::new(
        backend.clone(),
        notifier.clone(),
        SessionOptions {
            context,
            tick_source: TickSource::Manual,
            ..SessionOptions::default()
        },
    )
}
