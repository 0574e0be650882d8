// src/config.rs
//! Declarative configuration: relay endpoints, sources, feeds, and
//! operational knobs. The config file is the only way to add or modify a
//! source; code changes are needed only when a site's markup requires a
//! bespoke extraction strategy.
//!
//! Discovery order:
//! 1) $ONL_AGGREGATOR_CONFIG
//! 2) config/aggregator.toml
//! 3) built-in seed (the site set the service launched with)

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "ONL_AGGREGATOR_CONFIG";

/// One relay (indirection) endpoint. The target URL is appended to
/// `prefix`, percent-encoded when `encode_target` is set. Some relays wrap
/// the upstream body in a JSON envelope (`{"contents": ...}`); those set
/// `json_contents`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub prefix: String,
    #[serde(default)]
    pub encode_target: bool,
    #[serde(default)]
    pub json_contents: bool,
}

/// One external site/board being aggregated. Immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    /// Ordered candidate list-page URLs; the first that fetches and yields
    /// fragments wins.
    pub list_urls: Vec<String>,
    /// Registry id of the extraction strategy for this site.
    pub extractor: String,
    /// Substrings that mark a fragment as boilerplate/ad/navigation.
    #[serde(default)]
    pub noise_patterns: Vec<String>,
    /// Per-run cap on extracted posts.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Placeholder titles used only when synthetic backfill is enabled and
    /// this source comes back degraded.
    #[serde(default)]
    pub fallback_titles: Vec<String>,
}

/// A named, user-facing grouping of sources.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub key: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Overall wall-clock budget for one aggregation run; sources still
    /// pending at the cutoff are treated as failed for that run.
    #[serde(default = "default_run_budget_secs")]
    pub run_budget_secs: u64,
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
    /// Minimum extracted posts before a source counts as degraded.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: usize,
    #[serde(default = "default_min_title_chars")]
    pub min_title_chars: usize,
    /// When true, degraded sources are topped up to the quality threshold
    /// from their `fallback_titles`, each such post marked synthetic.
    #[serde(default)]
    pub synthetic_backfill: bool,
    #[serde(default = "default_relays")]
    pub relays: Vec<RelayConfig>,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cache_ttl_secs: default_cache_ttl_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            run_budget_secs: default_run_budget_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            quality_threshold: default_quality_threshold(),
            min_title_chars: default_min_title_chars(),
            synthetic_backfill: false,
            relays: default_relays(),
            feeds: default_feeds(),
            sources: default_sources(),
        }
    }
}

impl AppConfig {
    /// Load config from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config using env var + fallbacks; the built-in seed applies
    /// when no file is present.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/aggregator.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        Ok(Self::default())
    }

    /// Reject configs that reference undefined sources or duplicate ids.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for s in &self.sources {
            if !seen.insert(s.id.as_str()) {
                return Err(anyhow!("duplicate source id: {}", s.id));
            }
            if s.list_urls.is_empty() {
                return Err(anyhow!("source {} has no list_urls", s.id));
            }
        }
        for f in &self.feeds {
            for sid in &f.sources {
                if !seen.contains(sid.as_str()) {
                    return Err(anyhow!("feed {} references unknown source {sid}", f.key));
                }
            }
        }
        Ok(())
    }

    pub fn feed(&self, key: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|f| f.key == key)
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Sources of a feed in enumeration order (the dedup/tie-break order).
    pub fn feed_sources(&self, feed: &FeedConfig) -> Vec<&Source> {
        feed.sources
            .iter()
            .filter_map(|sid| self.source(sid))
            .collect()
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = toml::from_str::<AppConfig>(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str::<AppConfig>(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = toml::from_str::<AppConfig>(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported config format"))
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_refresh_interval_secs() -> u64 {
    3600
}
fn default_run_budget_secs() -> u64 {
    45
}
fn default_attempt_timeout_secs() -> u64 {
    12
}
fn default_quality_threshold() -> usize {
    3
}
fn default_min_title_chars() -> usize {
    5
}
fn default_max_items() -> usize {
    5
}

/// The public relay endpoints the service launched with. Order matters;
/// the chain is tried top to bottom.
fn default_relays() -> Vec<RelayConfig> {
    vec![
        RelayConfig {
            prefix: "https://api.allorigins.win/get?url=".into(),
            encode_target: true,
            json_contents: true,
        },
        RelayConfig {
            prefix: "https://cors-anywhere.herokuapp.com/".into(),
            encode_target: false,
            json_contents: false,
        },
        RelayConfig {
            prefix: "https://thingproxy.freeboard.io/fetch/".into(),
            encode_target: false,
            json_contents: false,
        },
        RelayConfig {
            prefix: "https://corsproxy.io/?".into(),
            encode_target: true,
            json_contents: false,
        },
    ]
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            key: "community:all".into(),
            sources: vec![
                "clien".into(),
                "cook82".into(),
                "empak".into(),
                "ddanzi".into(),
            ],
        },
        FeedConfig {
            key: "news:all".into(),
            sources: vec![
                "donga-all".into(),
                "hankook-all".into(),
                "chosun-all".into(),
                "mk-all".into(),
            ],
        },
        FeedConfig {
            key: "news:politics".into(),
            sources: vec!["donga-politics".into(), "hankook-politics".into()],
        },
        FeedConfig {
            key: "news:economy".into(),
            sources: vec!["donga-economy".into(), "hankook-economy".into()],
        },
        FeedConfig {
            key: "news:technology".into(),
            sources: vec!["donga-tech".into(), "mk-tech".into()],
        },
    ]
}

/// Shared boilerplate markers on the community boards. Login prompts,
/// navigation, and ad text show up inside list rows on all of them.
fn community_noise() -> Vec<String> {
    [
        "공지", "로그인", "회원가입", "즐겨찾기", "검색", "메뉴", "광고", "이벤트", "설정",
        "마이페이지", "게시판", "글번호",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn rss_source(id: &str, display_name: &str, base_url: &str, feed_url: &str) -> Source {
    Source {
        id: id.into(),
        display_name: display_name.into(),
        base_url: base_url.into(),
        list_urls: vec![feed_url.into()],
        extractor: "rss".into(),
        noise_patterns: vec!["[AD]".into(), "광고".into()],
        max_items: 3,
        fallback_titles: Vec::new(),
    }
}

fn default_sources() -> Vec<Source> {
    let mut sources = vec![
        Source {
            id: "clien".into(),
            display_name: "클리앙".into(),
            base_url: "https://www.clien.net".into(),
            list_urls: vec!["https://www.clien.net/service/board/park".into()],
            extractor: "clien".into(),
            noise_patterns: community_noise(),
            max_items: default_max_items(),
            fallback_titles: Vec::new(),
        },
        Source {
            id: "cook82".into(),
            display_name: "82쿡".into(),
            base_url: "https://www.82cook.com".into(),
            list_urls: vec!["https://www.82cook.com/entiz/enti.php?bn=15".into()],
            extractor: "cook82".into(),
            noise_patterns: community_noise(),
            max_items: default_max_items(),
            fallback_titles: Vec::new(),
        },
        Source {
            id: "empak".into(),
            display_name: "엠팍".into(),
            base_url: "https://mlbpark.donga.com".into(),
            list_urls: vec!["https://mlbpark.donga.com/mp/b.php?b=bullpen".into()],
            extractor: "empak".into(),
            noise_patterns: community_noise(),
            max_items: default_max_items(),
            fallback_titles: Vec::new(),
        },
        Source {
            id: "ddanzi".into(),
            display_name: "개드립".into(),
            base_url: "https://www.dogdrip.net".into(),
            list_urls: vec!["https://www.dogdrip.net/dogdrip".into()],
            extractor: "ddanzi".into(),
            noise_patterns: community_noise(),
            max_items: default_max_items(),
            fallback_titles: Vec::new(),
        },
    ];

    sources.extend([
        rss_source(
            "donga-all",
            "동아일보",
            "https://www.donga.com",
            "https://rss.donga.com/total.xml",
        ),
        rss_source(
            "hankook-all",
            "한국일보",
            "https://www.hankookilbo.com",
            "https://rss.hankookilbo.com/News.xml",
        ),
        rss_source(
            "chosun-all",
            "조선일보",
            "https://www.chosun.com",
            "https://rss.chosun.com/rss/news.xml",
        ),
        rss_source(
            "mk-all",
            "매일경제",
            "https://www.mk.co.kr",
            "https://rss.mk.co.kr/rss/30000001.xml",
        ),
        rss_source(
            "donga-politics",
            "동아일보 정치",
            "https://www.donga.com",
            "https://rss.donga.com/politics.xml",
        ),
        rss_source(
            "hankook-politics",
            "한국일보 정치",
            "https://www.hankookilbo.com",
            "https://rss.hankookilbo.com/Politics.xml",
        ),
        rss_source(
            "donga-economy",
            "동아일보 경제",
            "https://www.donga.com",
            "https://rss.donga.com/economy.xml",
        ),
        rss_source(
            "hankook-economy",
            "한국일보 경제",
            "https://www.hankookilbo.com",
            "https://rss.hankookilbo.com/Economy.xml",
        ),
        rss_source(
            "donga-tech",
            "동아일보 기술",
            "https://www.donga.com",
            "https://rss.donga.com/tech.xml",
        ),
        rss_source(
            "mk-tech",
            "매일경제 기술",
            "https://www.mk.co.kr",
            "https://rss.mk.co.kr/rss/30000004.xml",
        ),
    ]);

    sources
}
