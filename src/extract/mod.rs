// src/extract/mod.rs
//! Per-site extraction strategies.
//!
//! Each source site registers one [`SiteExtractor`] keyed by extractor id.
//! A strategy knows where post titles and stat fields live in the site's
//! markup, expressed as an ordered list of selector variants — markup
//! changes silently over time, so the first variant that yields a plausible
//! row wins. Adding a new site means registering a new strategy, never
//! editing shared code.

pub mod body;
pub mod rss;
pub mod sites;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Source;
use crate::extract::body::PostBody;

/// Titles shorter than this can't be real posts; used as the coarse
/// plausibility gate during selector probing. The normalizer applies the
/// configured (stricter) minimum afterwards.
const PLAUSIBLE_TITLE_CHARS: usize = 3;

/// One candidate post as found in the markup, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub views_text: Option<String>,
    pub time_text: Option<String>,
    pub preview: Option<String>,
    /// Set when the source exposes a machine-parseable timestamp (RSS).
    pub published_at: Option<DateTime<Utc>>,
}

impl RawFragment {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            author: None,
            views_text: None,
            time_text: None,
            preview: None,
            published_at: None,
        }
    }
}

/// Site-specific extraction strategy: listing rows for the feed pipeline,
/// and the content-selector variant for single post bodies.
pub trait SiteExtractor: Send + Sync {
    fn id(&self) -> &'static str;

    /// Extract candidate posts from a list page, capped at
    /// `source.max_items`. An empty result is a degraded outcome, not an
    /// error; the caller decides what to do with it.
    fn extract_listing(&self, html: &str, source: &Source) -> Vec<RawFragment>;

    /// Extract the full body of a single post page as structured segments.
    fn extract_body(&self, html: &str, source: &Source) -> PostBody;
}

/// Strategy registry keyed by extractor id.
pub struct ExtractorRegistry {
    by_id: HashMap<String, Arc<dyn SiteExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in site strategies.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(sites::clien::ClienExtractor));
        reg.register(Arc::new(sites::cook82::Cook82Extractor));
        reg.register(Arc::new(sites::empak::EmpakExtractor));
        reg.register(Arc::new(sites::ddanzi::DdanziExtractor));
        reg.register(Arc::new(rss::RssExtractor));
        reg
    }

    pub fn register(&mut self, extractor: Arc<dyn SiteExtractor>) {
        self.by_id.insert(extractor.id().to_string(), extractor);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn SiteExtractor>> {
        self.by_id.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.by_id.keys().map(String::as_str).collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Collapse an element's text nodes into one whitespace-normalized line.
pub(crate) fn element_text(el: &ElementRef) -> String {
    let raw: String = el.text().collect::<Vec<_>>().join(" ");
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a possibly relative href against the source base URL.
pub(crate) fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => format!("{base}{href}"),
    }
}

fn plausible(title: &str, source: &Source) -> bool {
    title.chars().count() >= PLAUSIBLE_TITLE_CHARS
        && !source.noise_patterns.iter().any(|p| title.contains(p))
}

/// Shared listing walk for the board-style sites: probe row-selector
/// variants in order, accept the first that yields at least one plausible
/// row, and read title/views/time cells out of each row.
pub(crate) fn select_listing(
    html: &str,
    source: &Source,
    row_selectors: &[Selector],
    title_link: &Selector,
    views_cell: &Selector,
    time_cell: &Selector,
) -> Vec<RawFragment> {
    let doc = Html::parse_document(html);

    for rows in row_selectors {
        let mut frags = Vec::new();
        for row in doc.select(rows) {
            if frags.len() >= source.max_items {
                break;
            }
            let Some(link) = row.select(title_link).next() else {
                continue;
            };
            let title = element_text(&link);
            if !plausible(&title, source) {
                continue;
            }
            let url = link
                .value()
                .attr("href")
                .map(|href| absolutize(&source.base_url, href));
            let views_text = row
                .select(views_cell)
                .next()
                .map(|el| element_text(&el))
                .filter(|s| !s.is_empty());
            let time_text = row
                .select(time_cell)
                .next()
                .map(|el| element_text(&el))
                .filter(|s| !s.is_empty());

            frags.push(RawFragment {
                title,
                url,
                author: None,
                views_text,
                time_text,
                preview: None,
                published_at: None,
            });
        }
        if !frags.is_empty() {
            return frags;
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_source() -> Source {
        Source {
            id: "board".into(),
            display_name: "게시판".into(),
            base_url: "https://board.example".into(),
            list_urls: vec!["https://board.example/list".into()],
            extractor: "clien".into(),
            noise_patterns: vec!["공지".into()],
            max_items: 5,
            fallback_titles: Vec::new(),
        }
    }

    #[test]
    fn absolutize_handles_relative_and_absolute() {
        assert_eq!(
            absolutize("https://board.example", "/post/1"),
            "https://board.example/post/1"
        );
        assert_eq!(
            absolutize("https://board.example", "https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[test]
    fn listing_probe_falls_through_to_later_selector_variant() {
        let html = r#"
            <table class="board_list">
              <tr><td><a href="/post/1">첫 번째 게시글 제목</a></td><td class="hit">120</td><td class="time">10:05</td></tr>
              <tr><td><a href="/post/2">공지: 점검 안내</a></td><td class="hit">5</td><td class="time">09:00</td></tr>
            </table>
        "#;
        let rows = vec![
            Selector::parse(".list_row").unwrap(),
            Selector::parse(".board_list tr").unwrap(),
        ];
        let title = Selector::parse("a[href]").unwrap();
        let views = Selector::parse(".hit").unwrap();
        let time = Selector::parse(".time").unwrap();

        let frags = select_listing(html, &board_source(), &rows, &title, &views, &time);
        assert_eq!(frags.len(), 1, "noise row dropped, first variant empty");
        assert_eq!(frags[0].title, "첫 번째 게시글 제목");
        assert_eq!(frags[0].url.as_deref(), Some("https://board.example/post/1"));
        assert_eq!(frags[0].views_text.as_deref(), Some("120"));
        assert_eq!(frags[0].time_text.as_deref(), Some("10:05"));
    }
}
