// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod relay;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::cache::{CacheRead, FeedCache};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::AppConfig;
pub use crate::model::{FeedSnapshot, Post};
pub use crate::relay::{PageFetcher, RelayClient};
pub use crate::scheduler::RefreshScheduler;

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::Aggregator;
use crate::content::PostContentFetcher;
use crate::extract::ExtractorRegistry;

/// Wire the full engine from a config and a fetcher. Tests pass fakes for
/// the fetcher and clock; the binary passes the relay client and the
/// system clock.
pub fn build_state(
    config: Arc<AppConfig>,
    fetcher: Arc<dyn PageFetcher>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let registry = Arc::new(ExtractorRegistry::with_builtins());
    let cache = Arc::new(FeedCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        Arc::clone(&clock),
    ));
    let aggregator = Arc::new(Aggregator::new(
        Arc::clone(&fetcher),
        Arc::clone(&registry),
        Arc::clone(&config),
        clock,
    ));
    let scheduler = Arc::new(RefreshScheduler::new(aggregator, Arc::clone(&cache)));
    let content = Arc::new(PostContentFetcher::new(fetcher, registry, Arc::clone(&config)));

    AppState {
        config,
        cache,
        scheduler,
        content,
    }
}
