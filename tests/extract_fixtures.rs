// tests/extract_fixtures.rs
//
// Listing and body extraction over fixed HTML/XML fixtures: every built-in
// strategy finds its rows, noise rows are dropped, and repeated extraction
// over the same input is byte-identical.

use onl_aggregator::config::Source;
use onl_aggregator::extract::body::BodySegment;
use onl_aggregator::extract::{ExtractorRegistry, SiteExtractor};

const CLIEN_LIST: &str = include_str!("fixtures/clien_list.html");
const EMPAK_LIST: &str = include_str!("fixtures/empak_list.html");
const COOK82_LIST: &str = include_str!("fixtures/cook82_list.html");
const DDANZI_LIST: &str = include_str!("fixtures/ddanzi_list.html");
const NEWS_RSS: &str = include_str!("fixtures/news_rss.xml");
const CLIEN_POST: &str = include_str!("fixtures/clien_post.html");

fn source(id: &str, base_url: &str, extractor: &str, noise: &[&str]) -> Source {
    Source {
        id: id.to_string(),
        display_name: id.to_string(),
        base_url: base_url.to_string(),
        list_urls: vec![format!("{base_url}/list")],
        extractor: extractor.to_string(),
        noise_patterns: noise.iter().map(|s| s.to_string()).collect(),
        max_items: 5,
        fallback_titles: Vec::new(),
    }
}

fn extract(extractor_id: &str, html: &str, src: &Source) -> Vec<onl_aggregator::extract::RawFragment> {
    let registry = ExtractorRegistry::with_builtins();
    let strategy = registry.get(extractor_id).expect("builtin strategy");
    strategy.extract_listing(html, src)
}

#[test]
fn clien_listing_drops_notice_rows_and_resolves_urls() {
    let src = source("clien", "https://www.clien.net", "clien", &["공지"]);
    let frags = extract("clien", CLIEN_LIST, &src);

    assert_eq!(frags.len(), 4, "notice row must be dropped");
    assert_eq!(frags[0].title, "주말에 다녀온 캠핑장 후기입니다");
    assert_eq!(
        frags[0].url.as_deref(),
        Some("https://www.clien.net/service/board/park/78901234")
    );
    assert_eq!(frags[0].views_text.as_deref(), Some("1,204"));
    assert_eq!(frags[0].time_text.as_deref(), Some("10:05"));
    assert_eq!(frags[3].time_text.as_deref(), Some("2024-03-03"));
}

#[test]
fn empak_listing_reads_hit_and_time_cells() {
    let src = source("empak", "https://mlbpark.donga.com", "empak", &["광고"]);
    let frags = extract("empak", EMPAK_LIST, &src);

    assert_eq!(frags.len(), 3, "the two-char ad row must be dropped");
    assert!(frags.iter().all(|f| f.views_text.is_some()));
    assert!(frags
        .iter()
        .all(|f| f.url.as_deref().unwrap().starts_with("https://mlbpark.donga.com/mp/b.php")));
}

#[test]
fn cook82_and_ddanzi_listings_yield_rows() {
    let cook = source("cook82", "https://www.82cook.com", "cook82", &[]);
    let frags = extract("cook82", COOK82_LIST, &cook);
    assert_eq!(frags.len(), 3);
    assert_eq!(frags[0].title, "김치냉장고 추천 부탁드려요");

    let ddanzi = source("ddanzi", "https://www.dogdrip.net", "ddanzi", &[]);
    let frags = extract("ddanzi", DDANZI_LIST, &ddanzi);
    assert_eq!(frags.len(), 3);
    assert_eq!(frags[0].views_text.as_deref(), Some("8,112"));
}

#[test]
fn rss_listing_caps_items_and_parses_timestamps() {
    let mut src = source("news", "https://news.example", "rss", &[]);
    src.max_items = 3;
    let frags = extract("rss", NEWS_RSS, &src);

    assert_eq!(frags.len(), 3);
    assert!(frags.iter().all(|f| f.published_at.is_some()));
    assert!(frags.iter().all(|f| f.preview.is_some()));
    assert_eq!(frags[0].title, "기준금리 동결 전망에 시장 안도");
}

#[test]
fn extraction_is_deterministic_over_identical_input() {
    let src = source("clien", "https://www.clien.net", "clien", &["공지"]);
    let first = extract("clien", CLIEN_LIST, &src);
    let second = extract("clien", CLIEN_LIST, &src);
    assert_eq!(first, second, "same input must yield identical fragments");

    let mut news = source("news", "https://news.example", "rss", &[]);
    news.max_items = 3;
    assert_eq!(
        extract("rss", NEWS_RSS, &news),
        extract("rss", NEWS_RSS, &news)
    );
}

#[test]
fn body_extraction_keeps_prose_and_media_segments() {
    let src = source("clien", "https://www.clien.net", "clien", &["로그인"]);
    let registry = ExtractorRegistry::with_builtins();
    let strategy = registry.get("clien").unwrap();

    let body = strategy.extract_body(CLIEN_POST, &src);
    assert!(!body.is_empty());

    let text = body.to_text();
    assert!(text.contains("캠핑장 후기를 남깁니다"));
    assert!(
        !text.contains("로그인 상태 유지"),
        "short noise line must not survive"
    );
    assert!(
        body.segments
            .iter()
            .any(|s| matches!(s, BodySegment::Image { url, .. } if url == "https://cdn.example/camp/site-view.jpg")),
        "bare image URL line becomes an image segment"
    );
    assert!(
        body.segments
            .iter()
            .any(|s| matches!(s, BodySegment::Image { url, alt } if url == "https://cdn.example/camp/firewood.png" && alt == "장작 사진")),
        "embedded <img> is collected with resolved src"
    );
    assert!(body
        .segments
        .iter()
        .any(|s| matches!(s, BodySegment::Marker(m) if m == "[이미지 1]")));
}
