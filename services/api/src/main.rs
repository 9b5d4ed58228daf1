use anyhow::Result;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod middleware;
mod routes;
mod state;

use analytics::{BackgroundRefresher, RecordStoreSource, RefreshCoordinator};
use auth::{
    rate_limiter::{RateLimiter, RateLimiterConfig},
    session::RedisSessionStores,
};
use common::{
    PgRecordStore, RecordStore,
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};
use tokio::net::TcpListener;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting HoneyBEE API service");

    let config = AppConfig::load()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
    if !redis_pool.health_check().await? {
        anyhow::bail!("Failed to connect to Redis");
    }

    let records: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));
    let sessions = Arc::new(RedisSessionStores::new(redis_pool, config.session_ttl_seconds));
    let coordinator = Arc::new(RefreshCoordinator::new(
        Arc::new(RecordStoreSource::new(records.clone())),
        Duration::from_secs(config.analytics_cache_ttl_seconds),
    ));

    let _scheduler = match &config.refresh_schedule {
        Some(schedule) => Some(
            BackgroundRefresher::new(coordinator.clone())
                .start(schedule)
                .await?,
        ),
        None => None,
    };

    let state = AppState::new(
        records,
        sessions,
        RateLimiter::new(RateLimiterConfig::from_env()),
        coordinator,
    );
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("API service listening on {}", config.bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
