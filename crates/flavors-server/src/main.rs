//! # flavors-server
//!
//! Recipe-sharing server for Festival Flavors.
//!
//! This binary provides:
//! - **Accounts** backed by a JSON credential file with salted password hashes
//! - **Recipe submission** with optional media, geolocation and transcription
//! - **Search** over submitted recipes by dish name
//! - **REST API** (axum) serving all of the above

use std::time::Duration;

use flavors_server::api::{self, AppState};
use flavors_server::config::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,flavors_server=debug,flavors_store=debug")
            }),
        )
        .init();

    info!("Starting Festival Flavors server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let http_addr = config.http_addr;

    // -----------------------------------------------------------------------
    // 3. Open stores and external services
    // -----------------------------------------------------------------------
    let app_state = AppState::from_config(config)?;
    info!(
        geolocation = app_state.geo.is_enabled(),
        transcription = app_state.transcriber.is_enabled(),
        "External services"
    );

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic session cleanup (every 10 minutes)
    let sessions = app_state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            sessions.purge_expired().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
