// tests/scheduler_runs.rs
//
// Refresh scheduler contract:
// - concurrent run_once calls for one feed collapse into one fetch wave
// - partial source failure still produces a snapshot with zero counts for
//   the failed source
// - total failure reports AllSourcesFailed and leaves the cache untouched

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use onl_aggregator::aggregate::Aggregator;
use onl_aggregator::cache::FeedCache;
use onl_aggregator::clock::ManualClock;
use onl_aggregator::config::{AppConfig, FeedConfig, Source};
use onl_aggregator::error::{AggregateError, FetchError};
use onl_aggregator::extract::ExtractorRegistry;
use onl_aggregator::model::FeedSnapshot;
use onl_aggregator::relay::PageFetcher;
use onl_aggregator::scheduler::RefreshScheduler;

const CLIEN_LIST: &str = include_str!("fixtures/clien_list.html");
const EMPAK_LIST: &str = include_str!("fixtures/empak_list.html");
const COOK82_LIST: &str = include_str!("fixtures/cook82_list.html");

struct MapFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
    delay: Duration,
}

impl MapFetcher {
    fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(0),
        }
    }

    fn with_delay(pages: HashMap<String, String>, delay: Duration) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.pages.get(url) {
            Some(body) => Ok(body.clone()),
            None => Err(FetchError::RelaysExhausted {
                url: url.to_string(),
                attempts: 4,
            }),
        }
    }
}

fn board_source(id: &str, base_url: &str, list_url: &str, extractor: &str) -> Source {
    Source {
        id: id.to_string(),
        display_name: id.to_string(),
        base_url: base_url.to_string(),
        list_urls: vec![list_url.to_string()],
        extractor: extractor.to_string(),
        noise_patterns: vec!["공지".to_string(), "광고".to_string()],
        max_items: 5,
        fallback_titles: Vec::new(),
    }
}

fn community_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        sources: vec![
            board_source(
                "clien",
                "https://www.clien.net",
                "https://www.clien.net/service/board/park",
                "clien",
            ),
            board_source(
                "empak",
                "https://mlbpark.donga.com",
                "https://mlbpark.donga.com/mp/b.php?b=bullpen",
                "empak",
            ),
            board_source(
                "cook82",
                "https://www.82cook.com",
                "https://www.82cook.com/entiz/enti.php?bn=15",
                "cook82",
            ),
        ],
        feeds: vec![FeedConfig {
            key: "community:test".into(),
            sources: vec!["clien".into(), "empak".into(), "cook82".into()],
        }],
        ..AppConfig::default()
    })
}

fn all_pages() -> HashMap<String, String> {
    HashMap::from([
        (
            "https://www.clien.net/service/board/park".to_string(),
            CLIEN_LIST.to_string(),
        ),
        (
            "https://mlbpark.donga.com/mp/b.php?b=bullpen".to_string(),
            EMPAK_LIST.to_string(),
        ),
        (
            "https://www.82cook.com/entiz/enti.php?bn=15".to_string(),
            COOK82_LIST.to_string(),
        ),
    ])
}

fn build_scheduler(
    fetcher: Arc<MapFetcher>,
    config: Arc<AppConfig>,
) -> (Arc<RefreshScheduler>, Arc<FeedCache>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
    ));
    let cache = Arc::new(FeedCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        clock.clone(),
    ));
    let aggregator = Arc::new(Aggregator::new(
        fetcher,
        Arc::new(ExtractorRegistry::with_builtins()),
        config,
        clock,
    ));
    (
        Arc::new(RefreshScheduler::new(aggregator, cache.clone())),
        cache,
    )
}

#[tokio::test]
async fn concurrent_run_once_collapses_into_one_fetch_wave() {
    let fetcher = Arc::new(MapFetcher::with_delay(
        all_pages(),
        Duration::from_millis(50),
    ));
    let (scheduler, _cache) = build_scheduler(fetcher.clone(), community_config());

    let (a, b) = tokio::join!(
        scheduler.run_once("community:test"),
        scheduler.run_once("community:test")
    );
    let a = a.expect("first caller");
    let b = b.expect("second caller");

    assert_eq!(a.generated_at, b.generated_at, "both callers share one run");
    assert_eq!(
        fetcher.calls(),
        3,
        "exactly one fetch per source despite two callers"
    );

    // A later call starts a new window and fetches again.
    scheduler.run_once("community:test").await.expect("rerun");
    assert_eq!(fetcher.calls(), 6);
}

#[tokio::test]
async fn partial_failure_keeps_run_alive_with_zero_count() {
    let mut pages = all_pages();
    pages.remove("https://www.82cook.com/entiz/enti.php?bn=15");
    let fetcher = Arc::new(MapFetcher::new(pages));
    let (scheduler, _cache) = build_scheduler(fetcher, community_config());

    let snapshot = scheduler
        .run_once("community:test")
        .await
        .expect("two healthy sources must carry the run");

    assert_eq!(snapshot.per_source_counts["cook82"], 0);
    assert!(snapshot.per_source_counts["clien"] >= 3);
    assert!(snapshot.per_source_counts["empak"] >= 3);
    assert!(!snapshot.posts.is_empty());
}

#[tokio::test]
async fn total_failure_reports_error_and_preserves_cache() {
    let fetcher = Arc::new(MapFetcher::new(HashMap::new()));
    let (scheduler, cache) = build_scheduler(fetcher, community_config());

    let prior = Arc::new(FeedSnapshot {
        feed_key: "community:test".into(),
        posts: Vec::new(),
        per_source_counts: BTreeMap::from([("clien".to_string(), 0)]),
        generated_at: Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap(),
    });
    cache.put("community:test", prior.clone());

    let err = scheduler
        .run_once("community:test")
        .await
        .expect_err("all sources down must fail the run");
    assert!(matches!(err, AggregateError::AllSourcesFailed { .. }));

    let kept = cache
        .last_known("community:test")
        .expect("cache must retain the pre-run snapshot");
    assert_eq!(kept.generated_at, prior.generated_at);
}

#[tokio::test]
async fn snapshot_is_sorted_most_recent_first_with_unique_ids() {
    let fetcher = Arc::new(MapFetcher::new(all_pages()));
    let (scheduler, _cache) = build_scheduler(fetcher, community_config());

    let snapshot = scheduler.run_once("community:test").await.expect("run");

    for pair in snapshot.posts.windows(2) {
        assert!(
            pair[0].published_at >= pair[1].published_at,
            "descending publishedAt ordering"
        );
    }

    let mut ids: Vec<_> = snapshot.posts.iter().map(|p| p.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), snapshot.posts.len());
}

#[tokio::test(start_paused = true)]
async fn periodic_loop_refreshes_immediately_and_on_interval() {
    let fetcher = Arc::new(MapFetcher::new(all_pages()));
    let (scheduler, cache) = build_scheduler(fetcher.clone(), community_config());

    let handle = scheduler
        .clone()
        .spawn_periodic("community:test", Duration::from_secs(3600));

    // The first tick fires immediately and populates the cache.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.calls(), 3);
    assert!(cache.last_known("community:test").is_some());

    // One interval later the loop runs again.
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(fetcher.calls(), 6);

    handle.abort();
}

#[tokio::test]
async fn unknown_feed_is_rejected() {
    let fetcher = Arc::new(MapFetcher::new(all_pages()));
    let (scheduler, _cache) = build_scheduler(fetcher, community_config());

    let err = scheduler.run_once("community:nope").await.unwrap_err();
    assert!(matches!(err, AggregateError::UnknownFeed(_)));
}
