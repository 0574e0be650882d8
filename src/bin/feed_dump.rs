//! One-shot aggregation demo: run a single feed through the live relay
//! chain and print the snapshot as JSON.
//!
//!     cargo run --bin feed_dump -- community:all

use std::sync::Arc;
use std::time::Duration;

use onl_aggregator::aggregate::Aggregator;
use onl_aggregator::clock::SystemClock;
use onl_aggregator::extract::ExtractorRegistry;
use onl_aggregator::relay::RelayClient;
use onl_aggregator::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter("onl_aggregator=info,warn")
        .compact()
        .init();

    let feed_key = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "community:all".to_string());

    let config = Arc::new(AppConfig::load_default()?);
    let fetcher = Arc::new(RelayClient::new(
        config.relays.clone(),
        Duration::from_secs(config.attempt_timeout_secs),
    ));
    let aggregator = Aggregator::new(
        fetcher,
        Arc::new(ExtractorRegistry::with_builtins()),
        Arc::clone(&config),
        Arc::new(SystemClock),
    );

    let snapshot = aggregator.run_feed(&feed_key).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
