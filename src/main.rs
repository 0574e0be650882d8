//! ONL Aggregator — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the relay client, the refresh
//! schedulers, and the metrics exporter.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use onl_aggregator::clock::SystemClock;
use onl_aggregator::metrics::Metrics;
use onl_aggregator::relay::RelayClient;
use onl_aggregator::{api, build_state, AppConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("onl_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Arc::new(AppConfig::load_default()?);
    let metrics = Metrics::init(config.cache_ttl_secs);

    let fetcher = Arc::new(RelayClient::new(
        config.relays.clone(),
        Duration::from_secs(config.attempt_timeout_secs),
    ));
    let state = build_state(Arc::clone(&config), fetcher, Arc::new(SystemClock));

    // One periodic refresh loop per configured feed. The first tick fires
    // immediately, so feeds are populated at startup.
    let interval = Duration::from_secs(config.refresh_interval_secs);
    for feed in &config.feeds {
        Arc::clone(&state.scheduler).spawn_periodic(&feed.key, interval);
    }

    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, feeds = config.feeds.len(), "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
