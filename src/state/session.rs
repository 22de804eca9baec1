//! Study session: the timer store, the local ticker and the phase policy
//! wired together behind the user's controls

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use serde::Serialize;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};

use crate::{
    error::{TimerError, TimerResult},
    services::{PhaseNotifier, TimerBackend},
    tasks::{IntervalSlot, TickSource},
};

use super::{
    phase::{DurationPreset, Phase, PhasePolicy, StudyContext},
    ticker::{LocalTicker, TickOutcome, TickerState},
    timer::{pick_active, Timer, TimerStatus, TimerType},
    timer_store::TimerStore,
};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Type of timers created from idle.
    pub timer_type: TimerType,
    pub policy: PhasePolicy,
    pub context: StudyContext,
    pub tick_source: TickSource,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timer_type: TimerType::Pomodoro,
            policy: PhasePolicy::pomodoro(),
            context: StudyContext::default(),
            tick_source: TickSource::default(),
        }
    }
}

/// Which controls make sense right now.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    pub can_start: bool,
    pub can_pause: bool,
    pub can_resume: bool,
    pub can_skip: bool,
    pub can_reset: bool,
}

impl Controls {
    fn for_active(active: Option<&Timer>, in_flight: bool) -> Self {
        if in_flight {
            return Self::default();
        }
        let status = active.map(|t| t.status);
        Self {
            can_start: matches!(status, None | Some(TimerStatus::Completed)),
            can_pause: status == Some(TimerStatus::Running),
            can_resume: status == Some(TimerStatus::Paused),
            can_skip: active.is_some(),
            can_reset: matches!(status, Some(TimerStatus::Running | TimerStatus::Paused)),
        }
    }
}

/// Everything a display needs, published after every change.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub ticker: TickerState,
    pub display_seconds: u64,
    pub active_timer: Option<Timer>,
    pub last_error: Option<String>,
    pub is_loading: bool,
    pub transition_in_flight: bool,
    pub policy: PhasePolicy,
    pub context: StudyContext,
    pub controls: Controls,
}

/// Serializes start and phase transitions. Waiters are woken whenever the
/// gate opens again.
#[derive(Default)]
struct TransitionGate {
    busy: AtomicBool,
    opened: Notify,
}

impl TransitionGate {
    fn enter(&self) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self))
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    async fn wait_open(&self) {
        loop {
            let opened = self.opened.notified();
            if !self.is_busy() {
                return;
            }
            opened.await;
        }
    }
}

/// Opens the gate when the guarded operation ends, including when its
/// future is dropped mid-way.
struct InFlightGuard<'a>(&'a TransitionGate);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
        self.0.opened.notify_waiters();
    }
}

pub struct Session {
    store: TimerStore,
    ticker: Mutex<LocalTicker>,
    policy: Mutex<PhasePolicy>,
    context: StudyContext,
    timer_type: TimerType,
    notifier: Arc<dyn PhaseNotifier>,
    interval: IntervalSlot,
    /// Busy while a start or phase transition is waiting on the server.
    in_flight: TransitionGate,
    torn_down: AtomicBool,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Session {
    pub fn new(
        backend: Arc<dyn TimerBackend>,
        notifier: Arc<dyn PhaseNotifier>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let ticker = LocalTicker::new();
        let initial = SessionSnapshot {
            phase: Phase::Work,
            ticker: ticker.state(),
            display_seconds: 0,
            active_timer: None,
            last_error: None,
            is_loading: false,
            transition_in_flight: false,
            policy: options.policy.clone(),
            context: options.context.clone(),
            controls: Controls::for_active(None, false),
        };
        let (snapshot_tx, _) = watch::channel(initial);

        Arc::new(Self {
            store: TimerStore::new(backend),
            ticker: Mutex::new(ticker),
            policy: Mutex::new(options.policy),
            context: options.context,
            timer_type: options.timer_type,
            notifier,
            interval: IntervalSlot::new(options.tick_source),
            in_flight: TransitionGate::default(),
            torn_down: AtomicBool::new(false),
            snapshot_tx,
        })
    }

    fn ticker(&self) -> MutexGuard<'_, LocalTicker> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_policy(&self) -> PhasePolicy {
        self.policy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self) -> &TimerStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn interval_armed(&self) -> bool {
        self.interval.is_armed()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let store = self.store.snapshot();
        let (ticker_state, display_seconds) = {
            let ticker = self.ticker();
            (ticker.state(), ticker.display_seconds())
        };
        let in_flight = self.in_flight.is_busy();
        let phase = store
            .active_timer
            .as_ref()
            .map(|t| Phase::from_is_break(t.is_break))
            .unwrap_or(Phase::Work);

        SessionSnapshot {
            phase,
            ticker: ticker_state,
            display_seconds,
            controls: Controls::for_active(store.active_timer.as_ref(), in_flight),
            active_timer: store.active_timer,
            last_error: store.last_error,
            is_loading: store.is_loading,
            transition_in_flight: in_flight,
            policy: self.current_policy(),
            context: self.context.clone(),
        }
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Re-seed the ticker from the store's active timer and arm or disarm
    /// the interval to match.
    fn sync_ticker(self: &Arc<Self>) {
        let (reseeded, ticking) = {
            let mut ticker = self.ticker();
            let (active, revision) = self.store.active_revision();
            let reseeded = ticker.resync(active.as_ref(), revision);
            (reseeded, ticker.is_ticking())
        };

        if ticking && !self.torn_down.load(Ordering::Acquire) {
            if reseeded || !self.interval.is_armed() {
                self.interval.arm(self);
            }
        } else {
            self.interval.disarm();
        }

        if reseeded {
            debug!("Local ticker re-seeded: {:?}", self.ticker().state());
        }
        self.publish();
    }

    fn guard_in_flight(&self) -> TimerResult<()> {
        if self.in_flight.is_busy() {
            return Err(TimerError::TransitionInFlight);
        }
        Ok(())
    }

    /// Recover an in-progress timer after a (re)start. With exactly one task
    /// in the study context the task's timers are searched, otherwise the
    /// user's active timers.
    pub async fn mount(self: &Arc<Self>) -> TimerResult<Option<Timer>> {
        self.torn_down.store(false, Ordering::Release);

        let timers = match self.context.task_ids.as_slice() {
            [task_id] => self.store.fetch_timers_for_task(*task_id).await,
            _ => self.store.fetch_active_timers().await,
        };
        let timers = match timers {
            Ok(timers) => timers,
            Err(e) => {
                self.publish();
                return Err(e);
            }
        };

        let active = pick_active(&timers).cloned();
        match &active {
            Some(timer) => info!(
                "Recovered timer #{} ({:?}, {}s left)",
                timer.id,
                timer.status,
                timer.seed_seconds()
            ),
            None => info!("No timer to recover"),
        }

        self.store.set_active(active.clone());
        self.sync_ticker();
        Ok(active)
    }

    /// Leave the session: no interval survives, and a running timer is
    /// paused on the server so persisted time matches what was shown.
    ///
    /// A start or transition already in flight is allowed to finish first,
    /// so the timer it creates is the one that gets paused.
    pub async fn unmount(self: &Arc<Self>) -> TimerResult<()> {
        self.torn_down.store(true, Ordering::Release);
        self.interval.disarm();
        self.ticker().halt();

        if self.in_flight.is_busy() {
            info!("Waiting for the phase transition in flight before leaving");
            self.in_flight.wait_open().await;
            self.interval.disarm();
            self.ticker().halt();
        }

        let result = match self.store.active_timer() {
            Some(active) if active.is_running() => {
                info!("Pausing timer #{} before leaving the session", active.id);
                self.store.pause_timer(active.id).await.map(|_| ())
            }
            _ => Ok(()),
        };

        // Adopt the paused record; torn_down keeps the interval disarmed.
        self.sync_ticker();
        result
    }

    /// Start a work phase from idle.
    pub async fn start(self: &Arc<Self>) -> TimerResult<Timer> {
        let Some(_guard) = self.in_flight.enter() else {
            return Err(TimerError::TransitionInFlight);
        };

        if let Some(active) = self.store.active_timer() {
            if !active.is_completed() {
                return Err(TimerError::AlreadyActive);
            }
        }

        let new_timer = self
            .current_policy()
            .timer_for(Phase::Work, self.timer_type, &self.context);
        self.publish();

        let result = self.store.create_timer(new_timer).await;
        drop(_guard);

        match result {
            Ok(timer) => {
                info!("Session started with timer #{}", timer.id);
                self.sync_ticker();
                Ok(timer)
            }
            Err(e) => {
                self.publish();
                Err(e)
            }
        }
    }

    pub async fn pause(self: &Arc<Self>) -> TimerResult<Timer> {
        self.guard_in_flight()?;
        let active = self.store.active_timer().ok_or(TimerError::NoActiveTimer)?;
        if !active.is_running() {
            return Err(TimerError::NotRunning(active.id));
        }

        let result = self.store.pause_timer(active.id).await;
        self.sync_ticker();
        result
    }

    pub async fn resume(self: &Arc<Self>) -> TimerResult<Timer> {
        self.guard_in_flight()?;
        let active = self.store.active_timer().ok_or(TimerError::NoActiveTimer)?;
        if active.status != TimerStatus::Paused {
            return Err(TimerError::NotPaused(active.id));
        }

        let result = self.store.resume_timer(active.id).await;
        self.sync_ticker();
        result
    }

    /// The play/pause button.
    pub async fn toggle(self: &Arc<Self>) -> TimerResult<Timer> {
        match self.store.active_timer().map(|t| t.status) {
            Some(TimerStatus::Running) => self.pause().await,
            Some(TimerStatus::Paused) => self.resume().await,
            None | Some(TimerStatus::Completed) => self.start().await,
        }
    }

    /// End the current phase early and move to the next one.
    pub async fn skip(self: &Arc<Self>) -> TimerResult<Timer> {
        info!("Skip requested");
        self.transition().await
    }

    /// Called when the local countdown reaches zero.
    pub async fn complete_phase(self: &Arc<Self>) -> TimerResult<Timer> {
        self.transition().await
    }

    /// Stop the active timer and go back to idle; the next start is a work
    /// phase.
    pub async fn reset(self: &Arc<Self>) -> TimerResult<()> {
        self.guard_in_flight()?;

        if let Some(active) = self.store.active_timer() {
            if !active.is_completed() {
                self.store.stop_timer(active.id).await.map_err(|e| {
                    self.publish();
                    e
                })?;
            }
        }

        self.store.release_active();
        info!("Session reset");
        self.sync_ticker();
        Ok(())
    }

    pub fn update_settings(
        &self,
        preset: DurationPreset,
        work_minutes: Option<u64>,
        break_minutes: Option<u64>,
    ) -> TimerResult<PhasePolicy> {
        let policy = match preset {
            DurationPreset::Pomodoro => PhasePolicy::pomodoro(),
            DurationPreset::Custom => {
                let current = self.current_policy();
                PhasePolicy::custom(
                    work_minutes.unwrap_or(current.work_seconds / 60),
                    break_minutes.unwrap_or(current.break_seconds / 60),
                )?
            }
        };

        info!(
            "Phase lengths set to {}s work / {}s break",
            policy.work_seconds, policy.break_seconds
        );
        *self.policy.lock().unwrap_or_else(PoisonError::into_inner) = policy.clone();
        self.publish();
        Ok(policy)
    }

    /// Re-read the active timer from the server and adopt whatever it says.
    pub async fn refresh_active(self: &Arc<Self>) -> TimerResult<Option<Timer>> {
        if self.in_flight.is_busy() {
            return Ok(self.store.active_timer());
        }
        let Some(active) = self.store.active_timer() else {
            return Ok(None);
        };
        if active.is_completed() {
            return Ok(Some(active));
        }

        let result = self.store.fetch_timer_by_id(active.id).await;
        self.sync_ticker();
        result.map(Some)
    }

    /// Advance the local countdown by one second.
    ///
    /// On expiry the ticker halts and the interval task that ticked gives up
    /// its slot; the caller is expected to follow with
    /// [`Session::complete_phase`].
    pub fn tick(&self) -> TickOutcome {
        let outcome = self.ticker().tick();
        match outcome {
            TickOutcome::Expired { .. } | TickOutcome::Inactive => self.interval.release(),
            TickOutcome::Advanced(_) => {}
        }
        if outcome != TickOutcome::Inactive {
            self.publish();
        }
        outcome
    }

    /// Tick once and run the phase transition inline if that tick expired
    /// the countdown. For callers that drive ticks themselves.
    pub async fn step(self: &Arc<Self>) -> TimerResult<TickOutcome> {
        let outcome = self.tick();
        if let TickOutcome::Expired { .. } = outcome {
            self.complete_phase().await?;
        }
        Ok(outcome)
    }

    async fn transition(self: &Arc<Self>) -> TimerResult<Timer> {
        let result = {
            let Some(_guard) = self.in_flight.enter() else {
                warn!("Phase transition rejected: another one is in flight");
                return Err(TimerError::TransitionInFlight);
            };
            self.run_transition().await
        };

        match &result {
            Ok(timer) => {
                self.sync_ticker();
                if let Err(e) = self.notifier.phase_started(timer) {
                    debug!("Phase notification failed: {}", e);
                }
            }
            Err(TimerError::NoActiveTimer) => {
                self.publish();
            }
            Err(e) => {
                error!("Phase transition aborted: {}", e);
                // Leave nothing half-adopted; the user restarts with start.
                self.store.release_active();
                self.sync_ticker();
            }
        }
        result
    }

    async fn run_transition(self: &Arc<Self>) -> TimerResult<Timer> {
        let current = self.store.active_timer().ok_or(TimerError::NoActiveTimer)?;

        self.interval.disarm();
        self.ticker().halt();
        self.publish();

        if !current.is_completed() {
            self.store.stop_timer(current.id).await?;
        }

        let next = self
            .current_policy()
            .successor(current.is_break, current.timer_type, &self.context);
        let timer = self.store.create_timer(next).await?;

        info!(
            "Phase advanced: timer #{} -> #{} ({})",
            current.id,
            timer.id,
            Phase::from_is_break(timer.is_break).label()
        );
        Ok(timer)
    }
}
