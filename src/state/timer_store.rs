//! Timer resource client: the only writer of the cached active timer

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;
use tracing::{error, info};

use crate::{
    error::{TimerError, TimerResult},
    services::TimerBackend,
};

use super::timer::{pick_active, NewTimer, Timer};

/// Cached view of the timer resource.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub timers: Vec<Timer>,
    pub active_timer: Option<Timer>,
    pub is_loading: bool,
    /// Message of the most recent failed call.
    pub last_error: Option<String>,
    /// Bumped on every write to `active_timer`.
    #[serde(skip)]
    pub revision: u64,
}

impl StoreState {
    fn write_active(&mut self, timer: Option<Timer>) {
        self.active_timer = timer;
        self.revision += 1;
    }

    /// Cache a list response. Completed records are history; of the
    /// non-completed ones only the active timer (or, with none, the newest)
    /// is kept.
    fn cache_list(&mut self, timers: &[Timer]) {
        let keep = self
            .active_timer
            .as_ref()
            .map(|t| t.id)
            .or_else(|| pick_active(timers).map(|t| t.id));
        self.timers = timers
            .iter()
            .filter(|t| t.is_completed() || Some(t.id) == keep)
            .cloned()
            .collect();
    }
}

/// Wraps a [`TimerBackend`] and keeps the cached copies in step with the
/// server's responses. Nothing here mutates a status optimistically: the
/// cache only changes once the server has answered.
pub struct TimerStore {
    backend: Arc<dyn TimerBackend>,
    state: Mutex<StoreState>,
}

impl TimerStore {
    pub fn new(backend: Arc<dyn TimerBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(StoreState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    pub fn active_timer(&self) -> Option<Timer> {
        self.lock().active_timer.clone()
    }

    /// The active timer with the revision it was written at.
    pub fn active_revision(&self) -> (Option<Timer>, u64) {
        let state = self.lock();
        (state.active_timer.clone(), state.revision)
    }

    pub fn timers(&self) -> Vec<Timer> {
        self.lock().timers.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub fn clear_error(&self) {
        self.lock().last_error = None;
    }

    /// Adopt `timer` as the active one, e.g. after recovering state on mount.
    pub fn set_active(&self, timer: Option<Timer>) {
        let mut state = self.lock();
        if let Some(timer) = &timer {
            upsert(&mut state.timers, timer);
        }
        state.write_active(timer);
    }

    /// Forget the active timer without touching the server.
    pub fn release_active(&self) -> Option<Timer> {
        let mut state = self.lock();
        let released = state.active_timer.take();
        state.revision += 1;
        released
    }

    /// Run one backend call with the loading flag raised, recording its
    /// failure in the error slot.
    async fn track<T, F>(&self, action: &str, call: F) -> TimerResult<T>
    where
        F: Future<Output = TimerResult<T>>,
    {
        {
            let mut state = self.lock();
            state.is_loading = true;
            state.last_error = None;
        }

        let result = call.await;

        let mut state = self.lock();
        state.is_loading = false;
        if let Err(e) = &result {
            error!("Failed to {}: {}", action, e);
            state.last_error = Some(e.to_string());
        }
        result
    }

    fn reject(&self, err: TimerError) -> TimerError {
        self.lock().last_error = Some(err.to_string());
        err
    }

    /// A cached completed timer can never be paused, resumed or stopped again.
    fn ensure_not_completed(&self, id: i64) -> TimerResult<()> {
        let completed = {
            let state = self.lock();
            state
                .timers
                .iter()
                .chain(state.active_timer.iter())
                .any(|t| t.id == id && t.is_completed())
        };
        if completed {
            return Err(self.reject(TimerError::AlreadyCompleted(id)));
        }
        Ok(())
    }

    /// Replace every cached copy of `timer` with the server's version.
    fn replace_cached(&self, timer: &Timer) {
        let mut state = self.lock();
        upsert(&mut state.timers, timer);
        if state.active_timer.as_ref().map(|t| t.id) == Some(timer.id) {
            state.write_active(Some(timer.clone()));
        }
    }

    pub async fn fetch_active_timers(&self) -> TimerResult<Vec<Timer>> {
        let timers = self
            .track("fetch active timers", self.backend.list_active())
            .await?;
        self.lock().cache_list(&timers);
        Ok(timers)
    }

    pub async fn fetch_break_timers(&self) -> TimerResult<Vec<Timer>> {
        self.track("fetch break timers", self.backend.list_breaks())
            .await
    }

    /// Re-read one timer; a cached copy (including the active one) is
    /// replaced by the response.
    pub async fn fetch_timer_by_id(&self, id: i64) -> TimerResult<Timer> {
        let timer = self.track("fetch timer", self.backend.get(id)).await?;
        let mut state = self.lock();
        if let Some(cached) = state.timers.iter_mut().find(|t| t.id == id) {
            *cached = timer.clone();
        }
        if state.active_timer.as_ref().map(|t| t.id) == Some(id) {
            state.write_active(Some(timer.clone()));
        }
        Ok(timer)
    }

    pub async fn fetch_all_timers(&self) -> TimerResult<Vec<Timer>> {
        let timers = self
            .track("fetch all timers", self.backend.list_all())
            .await?;
        self.lock().cache_list(&timers);
        Ok(timers)
    }

    pub async fn fetch_timers_for_task(&self, task_id: i64) -> TimerResult<Vec<Timer>> {
        self.track("fetch timers for task", self.backend.list_for_task(task_id))
            .await
    }

    pub async fn create_timer(&self, new_timer: NewTimer) -> TimerResult<Timer> {
        let timer = self
            .track("create timer", self.backend.create(&new_timer))
            .await?;

        info!(
            "Created timer #{} ({:?}, break={}, {}s)",
            timer.id,
            timer.timer_type,
            timer.is_break,
            timer.seed_seconds()
        );

        let mut state = self.lock();
        upsert(&mut state.timers, &timer);
        state.write_active(Some(timer.clone()));
        Ok(timer)
    }

    pub async fn pause_timer(&self, id: i64) -> TimerResult<Timer> {
        self.ensure_not_completed(id)?;
        let timer = self.track("pause timer", self.backend.pause(id)).await?;
        info!("Paused timer #{} at {:?}s", id, timer.remaining_seconds);
        self.replace_cached(&timer);
        Ok(timer)
    }

    pub async fn resume_timer(&self, id: i64) -> TimerResult<Timer> {
        self.ensure_not_completed(id)?;
        let timer = self.track("resume timer", self.backend.resume(id)).await?;
        info!("Resumed timer #{} at {:?}s", id, timer.remaining_seconds);
        self.replace_cached(&timer);
        Ok(timer)
    }

    /// Mark a timer completed. Does not start a successor.
    pub async fn stop_timer(&self, id: i64) -> TimerResult<Timer> {
        self.ensure_not_completed(id)?;
        let timer = self.track("stop timer", self.backend.stop(id)).await?;
        info!("Stopped timer #{}", id);
        self.replace_cached(&timer);
        Ok(timer)
    }

    pub async fn delete_timer(&self, id: i64) -> TimerResult<()> {
        self.track("delete timer", self.backend.delete(id)).await?;
        info!("Deleted timer #{}", id);

        let mut state = self.lock();
        state.timers.retain(|t| t.id != id);
        if state.active_timer.as_ref().map(|t| t.id) == Some(id) {
            state.write_active(None);
        }
        Ok(())
    }
}

fn upsert(timers: &mut Vec<Timer>, timer: &Timer) {
    match timers.iter_mut().find(|t| t.id == timer.id) {
        Some(cached) => *cached = timer.clone(),
        None => timers.push(timer.clone()),
    }
}
