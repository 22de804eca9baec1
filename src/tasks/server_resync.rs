//! Periodic re-read of the active timer from the server

use std::{sync::Arc, time::Duration};

use tokio::time::{interval_at, Instant};
use tracing::{info, warn};

use crate::state::Session;

/// Re-fetch the active timer every `period` so changes made elsewhere
/// (another tab, another device) reach the local ticker.
pub async fn server_resync_task(session: Arc<Session>, period: Duration) {
    info!("Starting server resync task every {:?}", period);

    let mut interval = interval_at(Instant::now() + period, period);

    loop {
        interval.tick().await;

        if let Err(e) = session.refresh_active().await {
            warn!("Server resync failed: {}", e);
        }
    }
}
