use auth_service::config::Config;
use auth_service::db::{UserStorage, connect_lazy};
use auth_service::service::startup::{StartupOptions, prepare_storage};
use auth_service::{AuthError, AuthState, auth_router};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), AuthError> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        on_sync_failure = ?cfg.on_sync_failure,
        sync_retries = cfg.sync_retries
    );

    // Phase 1: storage must be settled before any request is accepted.
    let storage = UserStorage::new(connect_lazy(&cfg.database_url)?);
    let schema = prepare_storage(&storage, &StartupOptions::from(&cfg)).await?;

    // Phase 2: serve.
    let app = auth_router(AuthState::new(storage.clone(), schema), &cfg);
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.pool().close().await;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
