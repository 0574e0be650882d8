// src/extract/sites/clien.rs
//! Clien board strategy.
//!
//! List rows appear under a few markup generations (`.list_row` is the
//! current one); post links are recognizable by the board path in the
//! href. Body pages keep the content in `.post_view` variants.

use once_cell::sync::Lazy;
use scraper::Selector;

use crate::config::Source;
use crate::extract::body::{select_body, PostBody};
use crate::extract::{select_listing, RawFragment, SiteExtractor};

static ROWS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".list_row", ".list_item", ".board_list tr"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/service/board/park"]"#).unwrap());
static VIEWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".list_count, .hit, .view_count").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse(".list_time, .time, .date").unwrap());

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".post_view",
        ".post_content",
        ".view_content",
        ".content",
        "article",
        ".article-content",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

pub struct ClienExtractor;

impl SiteExtractor for ClienExtractor {
    fn id(&self) -> &'static str {
        "clien"
    }

    fn extract_listing(&self, html: &str, source: &Source) -> Vec<RawFragment> {
        select_listing(html, source, &ROWS, &TITLE_LINK, &VIEWS, &TIME)
    }

    fn extract_body(&self, html: &str, source: &Source) -> PostBody {
        select_body(html, source, &CONTENT)
    }
}
