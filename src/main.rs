//! logdash - live dashboard for a web-server log monitoring API

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use logdash::api::ApiClient;
use logdash::config::Config;
use logdash::dashboard::{Dashboard, DashboardSettings};
use logdash::events::EventBus;
use logdash::scheduler::{Scheduler, StartupParams};
use logdash::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before any other initialization)
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));

    // Use LOG_FORMAT=gcp for structured GCP Cloud Logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "gcp" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting logdash...");
    info!("Polling log API at {}", config.api.base_url);

    let api = Arc::new(ApiClient::new(&config.api)?);

    // Create event bus for broadcasting document patches
    let (patch_tx, _) = tokio::sync::broadcast::channel(1000);
    let bus = EventBus::new(patch_tx);

    let dashboard = Arc::new(Dashboard::new(api, DashboardSettings::from_config(&config), bus.clone()));
    let scheduler = Arc::new(Scheduler::new(dashboard.clone(), &config.polling));

    // First load and timers in background; the page is served meanwhile
    let startup = scheduler.clone();
    tokio::spawn(async move {
        startup.start(StartupParams::default()).await;
    });

    let state = Arc::new(AppState {
        dashboard,
        scheduler,
        bus,
    });

    // Start web server (blocking)
    web::start_server(&config, state).await?;

    Ok(())
}
