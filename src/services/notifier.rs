//! Phase-change notification

use std::io::Write;

use tracing::info;

use crate::state::{phase::Phase, timer::Timer};

/// Told about every successful phase transition. Failures are reported back
/// as strings and never affect the session.
pub trait PhaseNotifier: Send + Sync {
    fn phase_started(&self, timer: &Timer) -> Result<(), String>;
}

/// Rings the terminal bell.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl PhaseNotifier for TerminalBell {
    fn phase_started(&self, timer: &Timer) -> Result<(), String> {
        info!(
            "{} phase started: {}",
            Phase::from_is_break(timer.is_break).label(),
            timer.title.as_deref().unwrap_or("untitled")
        );

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(b"\x07").map_err(bell_error)?;
        stdout.flush().map_err(bell_error)
    }
}

fn bell_error(e: std::io::Error) -> String {
    format!("Failed to ring terminal bell: {}", e)
}

/// Used with `--quiet`.
#[derive(Debug, Default)]
pub struct Silent;

impl PhaseNotifier for Silent {
    fn phase_started(&self, _timer: &Timer) -> Result<(), String> {
        Ok(())
    }
}
