use anyhow::Context;
use dispatch_core::geocode::NominatimGeocoder;
use dispatch_server::state::AppState;
use dispatch_server::{build_state, config, routes};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let demo = std::env::args().skip(1).any(|arg| arg == "--demo");
    let settings = config::load_settings()?;
    let geocoder = NominatimGeocoder::new(&settings.geocoder())
        .context("building geocoding client")?;

    let state = build_state(&settings, Arc::new(geocoder), demo);
    tokio::spawn(sweep_idle_sessions(state.clone()));
    let app = routes::dashboard_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("bind {}", settings.bind))?;
    info!(
        bind = %settings.bind,
        geocoder = %settings.geocoder_url,
        demo,
        "dispatch-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    info!("dispatch-server stopped");
    Ok(())
}

async fn sweep_idle_sessions(state: Arc<AppState>) {
    let period = (state.sessions.limits().idle_ttl / 2).max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let evicted = state.sessions.evict_idle();
        if evicted > 0 {
            info!(evicted, remaining = state.sessions.len(), "idle sessions dropped");
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
