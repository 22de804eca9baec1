//! Work/break phase policy: durations, presets and what the next timer looks like

use serde::{Deserialize, Serialize};

use crate::error::{TimerError, TimerResult};

use super::timer::{NewTimer, TimerType};

pub const POMODORO_WORK_SECONDS: u64 = 25 * 60;
pub const POMODORO_BREAK_SECONDS: u64 = 5 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    pub fn from_is_break(is_break: bool) -> Self {
        if is_break {
            Phase::Break
        } else {
            Phase::Work
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Phase::Break)
    }

    pub fn next(&self) -> Self {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::Break => "Break",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DurationPreset {
    /// Fixed 25/5.
    Pomodoro,
    Custom,
}

/// What the user is studying; feeds timer titles and task attribution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudyContext {
    pub label: Option<String>,
    pub task_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhasePolicy {
    pub preset: DurationPreset,
    pub work_seconds: u64,
    pub break_seconds: u64,
}

impl Default for PhasePolicy {
    fn default() -> Self {
        Self::pomodoro()
    }
}

impl PhasePolicy {
    pub fn pomodoro() -> Self {
        Self {
            preset: DurationPreset::Pomodoro,
            work_seconds: POMODORO_WORK_SECONDS,
            break_seconds: POMODORO_BREAK_SECONDS,
        }
    }

    /// Custom lengths in minutes. Zero-length phases are refused, and so are
    /// lengths too large to express in seconds.
    pub fn custom(work_minutes: u64, break_minutes: u64) -> TimerResult<Self> {
        if work_minutes == 0 || break_minutes == 0 {
            return Err(TimerError::InvalidSettings(format!(
                "phases must last at least one minute (work={work_minutes}, break={break_minutes})"
            )));
        }
        let (Some(work_seconds), Some(break_seconds)) =
            (work_minutes.checked_mul(60), break_minutes.checked_mul(60))
        else {
            return Err(TimerError::InvalidSettings(format!(
                "phase length out of range (work={work_minutes}, break={break_minutes})"
            )));
        };

        // Asking for exactly 25/5 is the pomodoro preset under another name.
        if work_seconds == POMODORO_WORK_SECONDS && break_seconds == POMODORO_BREAK_SECONDS {
            return Ok(Self::pomodoro());
        }
        Ok(Self {
            preset: DurationPreset::Custom,
            work_seconds,
            break_seconds,
        })
    }

    pub fn duration_for(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_seconds,
            Phase::Break => self.break_seconds,
        }
    }

    /// Create request for a timer in `phase`.
    pub fn timer_for(&self, phase: Phase, timer_type: TimerType, context: &StudyContext) -> NewTimer {
        let duration_seconds = timer_type
            .counts_down()
            .then(|| self.duration_for(phase));

        NewTimer {
            timer_type,
            title: title_for(phase, context),
            duration_seconds,
            is_break: phase.is_break(),
            task_ids: context.task_ids.clone(),
        }
    }

    /// Create request for the phase after a timer whose `is_break` flag is
    /// `finished_is_break`.
    pub fn successor(
        &self,
        finished_is_break: bool,
        timer_type: TimerType,
        context: &StudyContext,
    ) -> NewTimer {
        let next = Phase::from_is_break(finished_is_break).next();
        self.timer_for(next, timer_type, context)
    }
}

fn title_for(phase: Phase, context: &StudyContext) -> String {
    match context.label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => format!("{}: {}", phase.label(), label),
        _ => format!("{} session", phase.label()),
    }
}
