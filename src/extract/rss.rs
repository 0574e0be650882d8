// src/extract/rss.rs
//! RSS strategy for the news sources. One strategy serves every category
//! feed; the source config decides which feed URL it reads.

use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use scraper::Selector;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};
use tracing::warn;

use crate::config::Source;
use crate::extract::body::{select_body, PostBody};
use crate::extract::{RawFragment, SiteExtractor};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

/// Preview text is clipped to roughly a card's worth of characters.
const PREVIEW_CHARS: usize = 150;

/// Generic article containers; news sites vary but converge on a few ids.
static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "#articleBody",
        "#article-view-content-div",
        ".article_view",
        ".news_view",
        "article",
        ".article-body",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

fn parse_rfc2822_utc(ts: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let unix = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())?;
    chrono::DateTime::from_timestamp(unix, 0)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

fn clip_preview(s: &str) -> String {
    let cleaned = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() <= PREVIEW_CHARS {
        return cleaned;
    }
    let mut out: String = cleaned.chars().take(PREVIEW_CHARS).collect();
    out.push('…');
    out
}

pub struct RssExtractor;

impl SiteExtractor for RssExtractor {
    fn id(&self) -> &'static str {
        "rss"
    }

    fn extract_listing(&self, xml: &str, source: &Source) -> Vec<RawFragment> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = match from_str(&xml_clean) {
            Ok(rss) => rss,
            Err(e) => {
                warn!(source = %source.id, error = %e, "rss parse failed");
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(source.max_items);
        for item in rss.channel.item {
            if out.len() >= source.max_items {
                break;
            }
            let Some(title) = item.title.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            if source.noise_patterns.iter().any(|p| title.contains(p)) {
                continue;
            }

            out.push(RawFragment {
                title,
                url: item.link,
                author: item.author,
                views_text: None,
                time_text: item.pub_date.clone(),
                preview: item.description.as_deref().map(clip_preview),
                published_at: item.pub_date.as_deref().and_then(parse_rfc2822_utc),
            });
        }
        out
    }

    fn extract_body(&self, html: &str, source: &Source) -> PostBody {
        select_body(html, source, &CONTENT)
    }
}
