use std::net::SocketAddr;

use anyhow::Result;
use common::database::{DatabaseConfig, health_check, init_lazy_pool};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use conview::{
    AppConfig, AppState,
    config::StoreBackend,
    create_router, database,
    state::{build_limiters, counter_store},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting conview service");

    let config = AppConfig::load()?;

    let counters = counter_store(&config.rate_limit).await;
    let (auth_limiter, api_limiter) = build_limiters(&config.rate_limit, counters);

    let app_state = match config.store {
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on shutdown");
            AppState::in_memory(auth_limiter, api_limiter)
        }
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_lazy_pool(&db_config)?;

            // The service keeps running without a database
            if health_check(&pool).await {
                info!("Database connection successful");
                if let Err(e) = database::run_migrations(&pool).await {
                    error!("Failed to apply migrations: {}", e);
                }
            } else {
                warn!("Database unreachable, API requests will fail until it is available");
            }

            AppState::postgres(pool, auth_limiter, api_limiter)
        }
    };

    // Start the web server
    let app = create_router(app_state, &config.static_dir);

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Conview service listening on {}", config.bind_address());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Conview service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
