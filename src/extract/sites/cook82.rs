// src/extract/sites/cook82.rs
//! 82cook board strategy. Classic table markup; titles link into the
//! entiz board script.

use once_cell::sync::Lazy;
use scraper::Selector;

use crate::config::Source;
use crate::extract::body::{select_body, PostBody};
use crate::extract::{select_listing, RawFragment, SiteExtractor};

static ROWS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["#bbs_list tr", ".bbs_list tr", "table.bbs tr", ".list_tbody tr"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="read.php"], a[href*="enti.php"]"#).unwrap());
static VIEWS: Lazy<Selector> = Lazy::new(|| Selector::parse(".hit, .read_count, .hits").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse(".regdate, .date, .time").unwrap());

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["#articleBody", ".view_content", ".article_view", ".content", "article"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

pub struct Cook82Extractor;

impl SiteExtractor for Cook82Extractor {
    fn id(&self) -> &'static str {
        "cook82"
    }

    fn extract_listing(&self, html: &str, source: &Source) -> Vec<RawFragment> {
        select_listing(html, source, &ROWS, &TITLE_LINK, &VIEWS, &TIME)
    }

    fn extract_body(&self, html: &str, source: &Source) -> PostBody {
        select_body(html, source, &CONTENT)
    }
}
