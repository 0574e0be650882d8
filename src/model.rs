//! Core data model: normalized posts and per-feed snapshots.
//!
//! JSON field names follow the shape the clients already consume
//! (`source`, `publishedAt`, `perSourceCounts`, ...), hence the explicit
//! serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A normalized content item. Created once per aggregation run and never
/// mutated; the next run supersedes it with a fresh value under the same
/// derived id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(rename = "source")]
    pub source_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub author: String,
    pub views: u32,
    pub likes: u32,
    pub comments: u32,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub url: String,
    /// Set only on backfilled placeholder posts so consumers can choose
    /// whether to display them.
    #[serde(default)]
    pub synthetic: bool,
}

/// One feed snapshot: the merged, deduplicated, most-recent-first post list
/// plus per-source contribution counts for partial-failure visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub feed_key: String,
    pub posts: Vec<Post>,
    /// Source id -> number of posts contributed (zero for failed sources).
    pub per_source_counts: BTreeMap<String, usize>,
    pub generated_at: DateTime<Utc>,
}

impl FeedSnapshot {
    pub fn total_posts(&self) -> usize {
        self.posts.len()
    }
}

/// Derive the stable post id from the source id, the normalized title, and
/// the raw time text as scraped. The raw text (not the resolved timestamp)
/// keeps re-crawls of the same item idempotent even when `published_at`
/// falls back to crawl time.
pub fn derive_post_id(source_id: &str, title: &str, time_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(title.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(time_text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}", source_id, &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn post_id_is_deterministic_and_source_scoped() {
        let a = derive_post_id("clien", "제목입니다", "12:30");
        let b = derive_post_id("clien", "제목입니다", "12:30");
        let c = derive_post_id("empak", "제목입니다", "12:30");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("clien_"));
        assert_eq!(a.len(), "clien_".len() + 16);
    }

    #[test]
    fn post_id_changes_with_time_text() {
        let a = derive_post_id("clien", "제목", "12:30");
        let b = derive_post_id("clien", "제목", "12:31");
        assert_ne!(a, b);
    }

    #[test]
    fn snapshot_serializes_client_field_names() {
        let snap = FeedSnapshot {
            feed_key: "community:all".into(),
            posts: vec![Post {
                id: "clien_abc".into(),
                source_id: "clien".into(),
                title: "t".into(),
                preview: None,
                author: "익명1234".into(),
                views: 10,
                likes: 1,
                comments: 0,
                published_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
                url: "https://example.com/1".into(),
                synthetic: false,
            }],
            per_source_counts: BTreeMap::from([("clien".to_string(), 1)]),
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&snap).unwrap();
        assert!(json.get("perSourceCounts").is_some());
        assert!(json.get("generatedAt").is_some());
        let post = &json["posts"][0];
        assert_eq!(post["source"], "clien");
        assert!(post.get("publishedAt").is_some());
        assert!(post.get("preview").is_none(), "absent preview is omitted");
    }
}
