//! Session state
//!
//! The timer entity, the resource client that caches it, the local ticker
//! and the session that ties them to the user's controls.

pub mod phase;
pub mod session;
pub mod ticker;
pub mod timer;
pub mod timer_store;

// Re-export main types
pub use phase::{DurationPreset, Phase, PhasePolicy, StudyContext};
pub use session::{Controls, Session, SessionOptions, SessionSnapshot};
pub use ticker::{LocalTicker, TickOutcome, TickerState};
pub use timer::{NewTimer, Timer, TimerStatus, TimerType};
pub use timer_store::{StoreState, TimerStore};
