// src/normalize.rs
//! Fragment → Post normalization.
//!
//! Titles are entity-decoded, tag-stripped, whitespace-collapsed, and
//! length-bounded; noise titles are dropped. Optional fields the source
//! does not expose are synthesized: the author becomes an anonymized
//! placeholder and the engagement counts get bounded pseudo-random fill —
//! an explicit policy choice to keep feed cards populated, not a
//! measurement.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use once_cell::sync::OnceCell;
use rand::Rng;
use regex::Regex;

use crate::config::Source;
use crate::extract::RawFragment;
use crate::model::{derive_post_id, Post};

const MAX_TITLE_CHARS: usize = 120;

/// Synthesized engagement bounds. Views stay in [100, 10000].
const VIEWS_RANGE: std::ops::RangeInclusive<u32> = 100..=10_000;
const LIKES_RANGE: std::ops::RangeInclusive<u32> = 0..=300;
const COMMENTS_RANGE: std::ops::RangeInclusive<u32> = 0..=80;

/// Normalize a scraped title: decode entities, strip tags, collapse
/// whitespace, bound the length.
pub fn normalize_title(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    if out.chars().count() > MAX_TITLE_CHARS {
        out = out.chars().take(MAX_TITLE_CHARS).collect();
    }
    out
}

pub fn is_noise(title: &str, source: &Source) -> bool {
    source.noise_patterns.iter().any(|p| title.contains(p))
}

/// Best-effort parse of a board's raw view-count text ("1,234", "1.2만").
pub fn parse_views(text: &str) -> Option<u32> {
    let t = text.trim();
    if let Some(man) = t.strip_suffix('만') {
        let n: f64 = man.replace(',', "").parse().ok()?;
        return Some((n * 10_000.0) as u32);
    }
    let digits: String = t.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Best-effort parse of a board's raw time cell. Boards show "HH:MM" for
/// today's posts and a date for older ones; relative forms show up on a
/// few skins.
pub fn parse_listing_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    static RE_HM: OnceCell<Regex> = OnceCell::new();
    static RE_YMD: OnceCell<Regex> = OnceCell::new();
    static RE_MD: OnceCell<Regex> = OnceCell::new();
    static RE_REL: OnceCell<Regex> = OnceCell::new();

    let t = text.trim();

    let re_rel = RE_REL.get_or_init(|| Regex::new(r"^(\d+)\s*(분|시간|일)\s*전$").unwrap());
    if let Some(caps) = re_rel.captures(t) {
        let n: i64 = caps[1].parse().ok()?;
        let delta = match &caps[2] {
            "분" => chrono::Duration::minutes(n),
            "시간" => chrono::Duration::hours(n),
            _ => chrono::Duration::days(n),
        };
        return Some(now - delta);
    }

    let re_hm = RE_HM.get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());
    if let Some(caps) = re_hm.captures(t) {
        let (h, m): (u32, u32) = (caps[1].parse().ok()?, caps[2].parse().ok()?);
        let today = now.date_naive().and_hms_opt(h, m, 0)?;
        let mut dt = Utc.from_utc_datetime(&today);
        // A clock-only cell later than "now" belongs to yesterday.
        if dt > now {
            dt -= chrono::Duration::days(1);
        }
        return Some(dt);
    }

    let re_ymd =
        RE_YMD.get_or_init(|| Regex::new(r"^(\d{4})[.\-/](\d{1,2})[.\-/](\d{1,2})\.?$").unwrap());
    if let Some(caps) = re_ymd.captures(t) {
        let (y, mo, d): (i32, u32, u32) = (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        let date = chrono::NaiveDate::from_ymd_opt(y, mo, d)?.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&date));
    }

    let re_md = RE_MD.get_or_init(|| Regex::new(r"^(\d{1,2})[.\-/](\d{1,2})\.?$").unwrap());
    if let Some(caps) = re_md.captures(t) {
        let (mo, d): (u32, u32) = (caps[1].parse().ok()?, caps[2].parse().ok()?);
        let date = chrono::NaiveDate::from_ymd_opt(now.year(), mo, d)?.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&date));
    }

    None
}

fn anonymous_author() -> String {
    let mut rng = rand::rng();
    format!("익명{:04}", rng.random_range(0..10_000))
}

/// Convert raw fragments into canonical posts for one source. Dropped
/// fragments (noise, too short) simply don't appear; cross-source
/// deduplication happens at merge time.
pub fn normalize(
    fragments: Vec<RawFragment>,
    source: &Source,
    min_title_chars: usize,
    now: DateTime<Utc>,
) -> Vec<Post> {
    let mut rng = rand::rng();
    let mut out = Vec::with_capacity(fragments.len());

    for frag in fragments {
        let title = normalize_title(&frag.title);
        if title.chars().count() < min_title_chars || is_noise(&title, source) {
            continue;
        }

        let time_text = frag.time_text.clone().unwrap_or_default();
        let published_at = frag
            .published_at
            .or_else(|| parse_listing_time(&time_text, now))
            .unwrap_or(now);

        let views = frag
            .views_text
            .as_deref()
            .and_then(parse_views)
            .unwrap_or_else(|| rng.random_range(VIEWS_RANGE));

        out.push(Post {
            id: derive_post_id(&source.id, &title, &time_text),
            source_id: source.id.clone(),
            title,
            preview: frag.preview,
            author: frag
                .author
                .map(|a| normalize_title(&a))
                .filter(|a| !a.is_empty())
                .unwrap_or_else(anonymous_author),
            views,
            likes: rng.random_range(LIKES_RANGE),
            comments: rng.random_range(COMMENTS_RANGE),
            published_at,
            url: frag.url.unwrap_or_else(|| source.base_url.clone()),
            synthetic: false,
        });
    }

    out
}

/// Placeholder posts for a degraded source, every one explicitly marked
/// synthetic so consumers can choose whether to display them.
pub fn synthetic_posts(source: &Source, needed: usize, now: DateTime<Utc>) -> Vec<Post> {
    let mut rng = rand::rng();
    source
        .fallback_titles
        .iter()
        .take(needed)
        .map(|title| Post {
            id: derive_post_id(&source.id, title, "fallback"),
            source_id: source.id.clone(),
            title: title.clone(),
            preview: None,
            author: anonymous_author(),
            views: rng.random_range(VIEWS_RANGE),
            likes: rng.random_range(LIKES_RANGE),
            comments: rng.random_range(COMMENTS_RANGE),
            published_at: now,
            url: source.base_url.clone(),
            synthetic: true,
        })
        .collect()
}
