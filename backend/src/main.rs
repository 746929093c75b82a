//! Storefront entry-point: loads settings, connects adapters and serves the
//! REST API until interrupted.

mod server;

use actix_web::web;
use storefront::inbound::http::health::HealthState;
use storefront::settings::Settings;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, create_server};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(error) => {
                warn!(%error, "SIGTERM handler unavailable; waiting for ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = Settings::load().map_err(std::io::Error::other)?;
    let config = ServerConfig::from_settings(&settings).await?;
    let bind_addr = config.bind_addr();

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "storefront listening");

    let handle = server.handle();
    actix_web::rt::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested; draining connections");
        health_state.mark_unhealthy();
        handle.stop(true).await;
    });

    server.await?;
    info!("storefront stopped");
    Ok(())
}
