//! RouteAPI worker
//!
//! Connects to PostgreSQL and Redis, builds the lookup services and runs the
//! usage flush coordinator until interrupted.

use anyhow::Context;
use routeapi_core::{config::LoggingConfig, AppConfig};
use routeapi_services::RouteCore;
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing(logging: &LoggingConfig) {
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "routeapi={level},routeapi_services={level},routeapi_db={level},routeapi_cache={level},billing=info,sqlx=warn",
        ))
    });

    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting RouteAPI v{}", env!("CARGO_PKG_VERSION"));

    info!("Connecting to database and Redis...");
    let core = RouteCore::connect(&config)
        .await
        .context("Failed to initialize services")?;

    let coordinator = core.coordinator();
    info!(
        owner = %coordinator.owner(),
        interval_secs = config.metering.flush_interval_secs,
        lock_ttl_secs = config.metering.lock_ttl_secs,
        "Usage flush coordinator starting"
    );

    let shutdown = CancellationToken::new();
    let flush = coordinator.clone().spawn(shutdown.clone());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    shutdown.cancel();
    if let Err(e) = flush.await {
        warn!("Flush coordinator task ended abnormally: {}", e);
    }

    let stats = coordinator.stats();
    info!(
        cycles = stats.cycles_completed,
        entries = stats.entries_written,
        counts = stats.counts_written,
        lost = stats.counts_lost,
        at_risk = stats.counts_at_risk,
        "Flush totals at shutdown"
    );

    core.close().await;
    info!("RouteAPI stopped");
    Ok(())
}
