//! Background tasks module
//!
//! The local one-second ticker and the optional server resync loop.

pub mod local_ticker;
pub mod server_resync;

// Re-export main items
pub use local_ticker::{local_ticker_task, IntervalSlot, TickSource};
pub use server_resync::server_resync_task;
