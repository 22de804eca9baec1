//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::{
    error::TimerResult,
    state::{PhasePolicy, StudyContext},
};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "study-session")]
#[command(about = "Pomodoro study session kept in sync with a server-side timer")]
#[command(version)]
pub struct Config {
    /// Port for the local control API
    #[arg(short, long, env = "STUDY_SESSION_PORT", default_value = "20554")]
    pub port: u16,

    /// Host address for the local control API
    #[arg(long, env = "STUDY_SESSION_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Base URL of the timer resource
    #[arg(
        long,
        env = "STUDY_SESSION_API_URL",
        default_value = "http://localhost:8080/api/timer"
    )]
    pub api_url: String,

    /// Bearer token for the timer resource
    #[arg(long, env = "STUDY_SESSION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Work phase length in minutes
    #[arg(long, default_value = "25")]
    pub work_minutes: u64,

    /// Break phase length in minutes
    #[arg(long, default_value = "5")]
    pub break_minutes: u64,

    /// Module or task name shown in timer titles
    #[arg(long)]
    pub label: Option<String>,

    /// Task id to attribute timers to (repeatable)
    #[arg(long = "task")]
    pub tasks: Vec<i64>,

    /// Re-read the active timer from the server every N seconds (0 = never)
    #[arg(long, default_value = "0")]
    pub resync_secs: u64,

    /// Do not ring the bell on phase changes
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments and environment
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the control API address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn policy(&self) -> TimerResult<PhasePolicy> {
        PhasePolicy::custom(self.work_minutes, self.break_minutes)
    }

    pub fn context(&self) -> StudyContext {
        StudyContext {
            label: self.label.clone(),
            task_ids: self.tasks.clone(),
        }
    }

    pub fn resync_period(&self) -> Option<Duration> {
        (self.resync_secs > 0).then(|| Duration::from_secs(self.resync_secs))
    }
}
