//! coworking-booking server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use coworking_booking::app_state::AppState;
use coworking_booking::backend::{Backend, InMemoryBackend, PostgresBackend};
use coworking_booking::build_app;
use coworking_booking::config::BookingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = BookingConfig::from_env().context("loading configuration")?;
    tracing::info!(
        addr = %config.listen_addr,
        tz = %config.time_zone,
        "starting coworking-booking"
    );

    // Select backend
    let backend = if config.persistence_enabled {
        let postgres = PostgresBackend::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        postgres.migrate().await.context("running migrations")?;
        Backend::Postgres(postgres)
    } else {
        tracing::warn!("persistence disabled, using in-memory backend");
        Backend::Memory(InMemoryBackend::new())
    };
    tracing::info!(backend = backend.kind(), "backend ready");

    let listen_addr = config.listen_addr;
    let idle_timeout = config.wizard_idle_timeout;
    let app_state = AppState::new(backend, config);

    // Sweep idle wizard sessions
    let wizards = Arc::clone(&app_state.wizard_service);
    tokio::spawn(async move {
        let period = idle_timeout.clamp(Duration::from_secs(1), Duration::from_secs(300));
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            wizards.evict_idle(idle_timeout).await;
        }
    });

    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
