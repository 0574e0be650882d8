// src/scheduler.rs
//! Refresh orchestration: on-demand runs coalesced per feed key, plus the
//! hourly background ticker.
//!
//! Concurrent `run_once` calls for the same feed share one in-flight run:
//! the first caller executes the aggregation, everyone else awaits the
//! same cell and receives the same result. This is also what makes cache
//! writes single-writer per feed key.

use metrics::counter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::cache::FeedCache;
use crate::error::AggregateError;
use crate::model::FeedSnapshot;

type FlightResult = Result<Arc<FeedSnapshot>, AggregateError>;
type Flight = Arc<OnceCell<FlightResult>>;

pub struct RefreshScheduler {
    aggregator: Arc<Aggregator>,
    cache: Arc<FeedCache>,
    flights: Mutex<HashMap<String, Flight>>,
}

impl RefreshScheduler {
    pub fn new(aggregator: Arc<Aggregator>, cache: Arc<FeedCache>) -> Self {
        Self {
            aggregator,
            cache,
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a run for this feed key is currently in flight.
    pub fn is_refreshing(&self, feed_key: &str) -> bool {
        self.flights
            .lock()
            .expect("flight map lock poisoned")
            .contains_key(feed_key)
    }

    /// Run one aggregation for the feed, coalescing with any run already
    /// in flight. On success the cache is updated; on total failure it is
    /// left untouched so previous data remains servable.
    pub async fn run_once(&self, feed_key: &str) -> FlightResult {
        let flight: Flight = {
            let mut map = self.flights.lock().expect("flight map lock poisoned");
            Arc::clone(map.entry(feed_key.to_string()).or_default())
        };

        let result = flight
            .get_or_init(|| async {
                match self.aggregator.run_feed(feed_key).await {
                    Ok(snapshot) => {
                        let snapshot = Arc::new(snapshot);
                        self.cache.put(feed_key, Arc::clone(&snapshot));
                        Ok(snapshot)
                    }
                    Err(e) => Err(e),
                }
            })
            .await
            .clone();

        // Retire this flight so the next window starts a fresh run. Guard
        // against removing a newer flight that raced in after ours.
        {
            let mut map = self.flights.lock().expect("flight map lock poisoned");
            if let Some(current) = map.get(feed_key) {
                if Arc::ptr_eq(current, &flight) {
                    map.remove(feed_key);
                }
            }
        }

        result
    }

    /// Spawn the periodic refresh loop for one feed. The first tick fires
    /// immediately, so the feed is populated at startup.
    pub fn spawn_periodic(self: Arc<Self>, feed_key: &str, every: Duration) -> JoinHandle<()> {
        let scheduler = self;
        let feed_key = feed_key.to_string();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                counter!("scheduled_refresh_ticks_total").increment(1);
                match scheduler.run_once(&feed_key).await {
                    Ok(snapshot) => {
                        info!(
                            target: "scheduler",
                            feed = %feed_key,
                            posts = snapshot.posts.len(),
                            "scheduled refresh complete"
                        );
                    }
                    Err(e) => {
                        warn!(target: "scheduler", feed = %feed_key, error = %e, "scheduled refresh failed");
                    }
                }
            }
        })
    }
}
