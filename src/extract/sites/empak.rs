// src/extract/sites/empak.rs
//! MLBPark (bullpen) strategy. The body lives in `div.ar_txt`; the
//! surrounding toolbars never hold content, so the selector chain narrows
//! from the most specific form down.

use once_cell::sync::Lazy;
use scraper::Selector;

use crate::config::Source;
use crate::extract::body::{select_body, PostBody};
use crate::extract::{select_listing, RawFragment, SiteExtractor};

static ROWS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".list_row", ".list_item", ".board_list tr", ".list_table tr"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/mp/b.php"]"#).unwrap());
static VIEWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".hit, .view_count, .list_count").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse(".time, .date, .list_time").unwrap());

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "div.ar_txt#contentDetail",
        ".ar_txt#contentDetail",
        "div.ar_txt",
        "#contentDetail",
        ".ar_txt",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

pub struct EmpakExtractor;

impl SiteExtractor for EmpakExtractor {
    fn id(&self) -> &'static str {
        "empak"
    }

    fn extract_listing(&self, html: &str, source: &Source) -> Vec<RawFragment> {
        select_listing(html, source, &ROWS, &TITLE_LINK, &VIEWS, &TIME)
    }

    fn extract_body(&self, html: &str, source: &Source) -> PostBody {
        select_body(html, source, &CONTENT)
    }
}
