//! Load the demo accounts and posts
//!
//! Runs against the configured store; with `CONVIEW_STORE=postgres` the
//! database must be reachable.

use anyhow::Result;
use common::database::{DatabaseConfig, init_pool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use conview::{
    AppConfig, AppState,
    config::StoreBackend,
    database,
    seed::{DEMO_PASSWORD, seed_demo_data},
    state::{build_limiters, counter_store},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    let counters = counter_store(&config.rate_limit).await;
    let (auth_limiter, api_limiter) = build_limiters(&config.rate_limit, counters);

    let app_state = match config.store {
        StoreBackend::Memory => AppState::in_memory(auth_limiter, api_limiter),
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;
            database::run_migrations(&pool).await?;
            AppState::postgres(pool, auth_limiter, api_limiter)
        }
    };

    let report = seed_demo_data(&app_state).await?;
    info!(
        "Seeding finished: {} users, {} posts created",
        report.users_created, report.posts_created
    );
    info!(
        "Demo credentials: Alice, Bob, NotesGroup with password {}",
        DEMO_PASSWORD
    );

    Ok(())
}
