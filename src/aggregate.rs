// src/aggregate.rs
//! The per-feed aggregation run: fetch every source in parallel, extract,
//! normalize, merge, dedup, sort.
//!
//! Partial failure is the normal case. A source that cannot be fetched
//! contributes zero posts and is recorded as such in the snapshot's
//! per-source counts; only a run where *every* source fails is reported as
//! a feed-level error, and in that case the cache is left untouched by the
//! caller.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{AppConfig, Source};
use crate::error::{AggregateError, FetchError};
use crate::extract::ExtractorRegistry;
use crate::model::{FeedSnapshot, Post};
use crate::normalize::{normalize, synthetic_posts};
use crate::relay::PageFetcher;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_runs_total", "Aggregation runs started.");
        describe_counter!(
            "feed_run_failures_total",
            "Runs where every source failed."
        );
        describe_counter!("source_failures_total", "Sources failing within a run.");
        describe_counter!(
            "source_degraded_total",
            "Sources yielding fewer posts than the quality threshold."
        );
        describe_counter!("posts_kept_total", "Posts kept after merge + dedup.");
        describe_counter!("posts_deduped_total", "Posts removed as duplicates.");
        describe_counter!(
            "posts_synthetic_total",
            "Placeholder posts generated by the backfill policy."
        );
        describe_gauge!("feed_last_run_ts", "Unix ts of the last aggregation run.");
    });
}

pub struct Aggregator {
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<ExtractorRegistry>,
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        registry: Arc<ExtractorRegistry>,
        config: Arc<AppConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one aggregation for a feed key. Sources fan out in parallel,
    /// each bounded by the run budget; the relay chain inside one source
    /// stays sequential.
    pub async fn run_feed(&self, feed_key: &str) -> Result<FeedSnapshot, AggregateError> {
        ensure_metrics_described();

        let feed = self
            .config
            .feed(feed_key)
            .ok_or_else(|| AggregateError::UnknownFeed(feed_key.to_string()))?;
        let sources = self.config.feed_sources(feed);
        let budget = Duration::from_secs(self.config.run_budget_secs);
        let now = self.clock.now();

        counter!("feed_runs_total").increment(1);

        let results = join_all(sources.iter().map(|&source| async move {
            match tokio::time::timeout(budget, self.crawl_source(source, now)).await {
                Ok(res) => res,
                Err(_) => Err(FetchError::BudgetExceeded),
            }
        }))
        .await;

        let snapshot = self.merge(feed_key, &sources, results, now)?;

        gauge!("feed_last_run_ts").set(now.timestamp().max(0) as f64);
        info!(
            feed = %feed_key,
            posts = snapshot.posts.len(),
            sources = sources.len(),
            "aggregation run complete"
        );
        Ok(snapshot)
    }

    /// Fetch and extract one source: candidate list URLs in order, first
    /// one that fetches *and* yields fragments wins. Fetched-but-empty is
    /// a degraded success; nothing fetched at all is a failure.
    async fn crawl_source(
        &self,
        source: &Source,
        now: DateTime<Utc>,
    ) -> Result<Vec<Post>, FetchError> {
        let Some(extractor) = self.registry.get(&source.extractor) else {
            warn!(
                source = %source.id,
                extractor = %source.extractor,
                "no extraction strategy registered; source contributes nothing"
            );
            return Ok(Vec::new());
        };

        let mut fetched_any = false;
        let mut last_err: Option<FetchError> = None;

        for list_url in &source.list_urls {
            match self.fetcher.fetch(list_url).await {
                Ok(payload) => {
                    fetched_any = true;
                    let fragments = extractor.extract_listing(&payload, source);
                    if fragments.is_empty() {
                        debug!(source = %source.id, url = %list_url, "no fragments; trying next list url");
                        continue;
                    }
                    return Ok(normalize(
                        fragments,
                        source,
                        self.config.min_title_chars,
                        now,
                    ));
                }
                Err(e) => {
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if !fetched_any => Err(e),
            _ => Ok(Vec::new()),
        }
    }

    fn merge(
        &self,
        feed_key: &str,
        sources: &[&Source],
        results: Vec<Result<Vec<Post>, FetchError>>,
        now: DateTime<Utc>,
    ) -> Result<FeedSnapshot, AggregateError> {
        let mut per_source_counts = BTreeMap::new();
        let mut seen_titles: HashSet<String> = HashSet::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut posts: Vec<Post> = Vec::new();
        let mut failures = 0usize;

        for (&source, result) in sources.iter().zip(results) {
            match result {
                Ok(mut list) => {
                    if self.config.synthetic_backfill
                        && list.len() < self.config.quality_threshold
                    {
                        let needed = self.config.quality_threshold - list.len();
                        let fill = synthetic_posts(source, needed, now);
                        counter!("posts_synthetic_total").increment(fill.len() as u64);
                        list.extend(fill);
                    }
                    if list.len() < self.config.quality_threshold {
                        counter!("source_degraded_total").increment(1);
                        debug!(
                            source = %source.id,
                            extracted = list.len(),
                            threshold = self.config.quality_threshold,
                            "degraded source accepted"
                        );
                    }

                    let mut contributed = 0usize;
                    for post in list {
                        if !seen_titles.insert(post.title.clone()) {
                            counter!("posts_deduped_total").increment(1);
                            continue;
                        }
                        if !seen_ids.insert(post.id.clone()) {
                            continue;
                        }
                        contributed += 1;
                        posts.push(post);
                    }
                    per_source_counts.insert(source.id.clone(), contributed);
                }
                Err(e) => {
                    failures += 1;
                    counter!("source_failures_total").increment(1);
                    warn!(feed = %feed_key, source = %source.id, error = %e, "source failed this run");
                    per_source_counts.insert(source.id.clone(), 0);
                }
            }
        }

        if !sources.is_empty() && failures == sources.len() {
            counter!("feed_run_failures_total").increment(1);
            return Err(AggregateError::AllSourcesFailed {
                feed_key: feed_key.to_string(),
            });
        }

        // Most recent first; the sort is stable, so equal timestamps keep
        // source-enumeration order and then listing order.
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        counter!("posts_kept_total").increment(posts.len() as u64);

        Ok(FeedSnapshot {
            feed_key: feed_key.to_string(),
            posts,
            per_source_counts,
            generated_at: now,
        })
    }
}
