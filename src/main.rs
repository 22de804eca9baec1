//! Study Session - pomodoro study timer daemon
//!
//! Recovers the user's in-progress timer, ticks it locally, and serves the
//! session controls over a small local HTTP API.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use study_session::{
    api::create_router,
    config::Config,
    services::{HttpTimerBackend, PhaseNotifier, Silent, StaticToken, TerminalBell},
    state::{Session, SessionOptions},
    tasks::{server_resync_task, TickSource},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "study_session={},tower_http=info",
            config.log_level()
        ))
        .init();

    info!("Starting study-session v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: api={}, work={}min, break={}min, label={:?}",
        config.api_url, config.work_minutes, config.break_minutes, config.label
    );

    let policy = config.policy()?;
    let credentials = Arc::new(StaticToken::new(config.token.clone()));
    if config.token.is_none() {
        warn!("No token configured; every timer request will fail until one is set");
    }
    let backend = Arc::new(HttpTimerBackend::new(config.api_url.clone(), credentials));
    let notifier: Arc<dyn PhaseNotifier> = if config.quiet {
        Arc::new(Silent)
    } else {
        Arc::new(TerminalBell)
    };

    let session = Session::new(
        backend,
        notifier,
        SessionOptions {
            policy,
            context: config.context(),
            tick_source: TickSource::default(),
            ..SessionOptions::default()
        },
    );

    // Pick up a timer left running by a previous run or another client
    if let Err(e) = session.mount().await {
        error!("Could not recover session state: {}", e);
    }

    if let Some(period) = config.resync_period() {
        let resync_session = Arc::clone(&session);
        tokio::spawn(async move {
            server_resync_task(resync_session, period).await;
        });
    }

    let app = create_router(Arc::clone(&session));

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Control API running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timer/start    - Start a work phase");
    info!("  POST   /timer/pause    - Pause the running timer");
    info!("  POST   /timer/resume   - Resume the paused timer");
    info!("  POST   /timer/toggle   - Start, pause or resume");
    info!("  POST   /timer/skip     - Skip to the next phase");
    info!("  POST   /timer/reset    - Stop and go idle");
    info!("  PUT    /timer/settings - Change phase lengths");
    info!("  DELETE /timer/error    - Dismiss the last error");
    info!("  GET    /status         - Current session");
    info!("  GET    /health         - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        signal = shutdown_signal() => {
            match signal {
                Ok(signal) => info!("Shutdown signal {} received", signal),
                Err(e) => error!("Signal handler failed: {}", e),
            }
        }
    }

    if let Err(e) = session.unmount().await {
        error!("Failed to pause the running timer on shutdown: {}", e);
    }

    info!("Session closed");
    Ok(())
}
