//! # taxi-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the taxi fleet API.
//! Binds to configurable port (default 8080).

use taxi_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let port = config.port;

    // Initialize database pool (optional: absent means in-memory only).
    let db_pool = taxi_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = AppState::with_config(config, db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    taxi_api::bootstrap::bootstrap_driver(&state)
        .await
        .map_err(|e| {
            tracing::error!("Bootstrap failed: {e}");
            e
        })?;

    if state.drivers.is_empty() {
        tracing::warn!(
            "no drivers registered; set BOOTSTRAP_USERNAME, BOOTSTRAP_PASSWORD and \
             BOOTSTRAP_LICENSE_NUMBER to create the first account"
        );
    }

    // Expired sessions are dropped lazily on lookup; sweep the rest hourly.
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "purged expired sessions");
            }
        }
    });

    let app = taxi_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Taxi fleet API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
