//! Subscription scheduler daemon.
//!
//! Periodically materializes upcoming subscription payments and executes the
//! due ones through the transfer engine. Every pass is idempotent, so the
//! daemon can run alongside on-demand syncs triggered elsewhere.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payvault_core::notify::LogNotifier;
use payvault_core::scheduler::{ChargeOutcome, SchedulerService};
use payvault_core::transfer::TransferEngine;
use payvault_db::SqlStore;
use payvault_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payvault=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = payvault_db::connect(&config.database.url, config.database.max_connections).await?;
    info!("Connected to database");

    let store = Arc::new(SqlStore::new(db, config.engine.lock_timeout_ms));
    let engine = Arc::new(TransferEngine::new(
        store,
        config.engine.clone(),
        Arc::new(LogNotifier),
    ));
    let scheduler = SchedulerService::new(engine, config.scheduler.clone());

    let interval = Duration::from_secs(config.scheduler.sync_interval_secs);
    info!(
        interval_secs = config.scheduler.sync_interval_secs,
        horizon_days = config.scheduler.horizon_days,
        "scheduler daemon started"
    );

    loop {
        let today = Utc::now().date_naive();

        match scheduler.sync_all(today).await {
            Ok(report) => info!(
                synced = report.synced,
                created = report.created,
                skipped = report.skipped,
                "sync pass finished"
            ),
            Err(err) => error!(%err, "sync pass failed"),
        }

        match scheduler.run_due(today).await {
            Ok(outcomes) => {
                let settled = outcomes
                    .iter()
                    .filter(|o| matches!(o, ChargeOutcome::Settled(_)))
                    .count();
                let failed = outcomes
                    .iter()
                    .filter(|o| matches!(o, ChargeOutcome::Failed { .. }))
                    .count();
                if settled > 0 || failed > 0 {
                    info!(settled, failed, "charge pass finished");
                }
            }
            Err(err) => error!(%err, "charge pass failed"),
        }

        tokio::time::sleep(interval).await;
    }
}
