//! External collaborators
//!
//! The timer REST resource, the credential that authorizes it, and the
//! phase-change notifier.

pub mod credentials;
pub mod notifier;
pub mod timer_api;

// Re-export main types
pub use credentials::{CredentialProvider, StaticToken};
pub use notifier::{PhaseNotifier, Silent, TerminalBell};
pub use timer_api::{HttpTimerBackend, TimerBackend};
