// src/extract/sites/ddanzi.rs
//! Dogdrip board strategy (XE-based markup).

use once_cell::sync::Lazy;
use scraper::Selector;

use crate::config::Source;
use crate::extract::body::{select_body, PostBody};
use crate::extract::{select_listing, RawFragment, SiteExtractor};

static ROWS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".ed.board-list .item", "tr.notice ~ tr", "table.ed tr", ".board_list tr"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/dogdrip/"], a.ed.link, td.title a"#).unwrap());
static VIEWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".readNum, .hit, .view_count").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse(".time, .date, .regdate").unwrap());

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".ed.article-wrapper .xe_content",
        ".xe_content",
        ".article_body",
        ".content",
        "article",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

pub struct DdanziExtractor;

impl SiteExtractor for DdanziExtractor {
    fn id(&self) -> &'static str {
        "ddanzi"
    }

    fn extract_listing(&self, html: &str, source: &Source) -> Vec<RawFragment> {
        select_listing(html, source, &ROWS, &TITLE_LINK, &VIEWS, &TIME)
    }

    fn extract_body(&self, html: &str, source: &Source) -> PostBody {
        select_body(html, source, &CONTENT)
    }
}
