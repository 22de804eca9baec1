//! Study Session - a pomodoro study timer kept in sync with a server-side timer
//!
//! A local per-second countdown runs between round-trips to the timer
//! resource, re-seeds itself from every server response, and creates the
//! next work or break timer when a phase ends.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{TimerError, TimerResult};
pub use state::{Session, SessionOptions, SessionSnapshot};
pub use utils::signals::shutdown_signal;
