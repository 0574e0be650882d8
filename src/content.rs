// src/content.rs
//! Lazy single-post body fetching.
//!
//! Invoked when a client opens a post's detail view; independent of the
//! feed pipeline. Bodies are cached per post URL so reopening a post
//! within a session costs no network round-trip.

use metrics::counter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

use crate::config::{AppConfig, Source};
use crate::error::ContentError;
use crate::extract::body::PostBody;
use crate::extract::ExtractorRegistry;
use crate::relay::PageFetcher;

/// Session cache bound; the map is cleared wholesale when it fills.
const BODY_CACHE_CAP: usize = 256;

pub struct PostContentFetcher {
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<ExtractorRegistry>,
    config: Arc<AppConfig>,
    cache: Mutex<HashMap<String, Arc<PostBody>>>,
}

impl PostContentFetcher {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        registry: Arc<ExtractorRegistry>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Match a post URL to its configured source by host.
    fn source_for_url(&self, url: &str) -> Option<&Source> {
        let host = Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
        self.config.sources.iter().find(|s| {
            let Some(base_host) = Url::parse(&s.base_url)
                .ok()
                .and_then(|b| b.host_str().map(str::to_ascii_lowercase))
            else {
                return false;
            };
            host == base_host
                || host.ends_with(&format!(".{base_host}"))
                || base_host.ends_with(&format!(".{host}"))
        })
    }

    /// Fetch and extract one post body through the relay layer, as
    /// structured segments.
    pub async fn fetch_body(&self, url: &str) -> Result<Arc<PostBody>, ContentError> {
        {
            let cache = self.cache.lock().expect("body cache lock poisoned");
            if let Some(body) = cache.get(url) {
                counter!("body_cache_hits_total").increment(1);
                return Ok(Arc::clone(body));
            }
        }

        let source = self
            .source_for_url(url)
            .ok_or_else(|| ContentError::UnknownSource(url.to_string()))?;
        let extractor = self
            .registry
            .get(&source.extractor)
            .ok_or_else(|| ContentError::UnknownSource(url.to_string()))?;

        counter!("body_fetches_total").increment(1);
        let html = self.fetcher.fetch(url).await?;
        let body = extractor.extract_body(&html, source);
        if body.is_empty() {
            counter!("body_fetch_errors_total").increment(1);
            return Err(ContentError::BodyNotFound(url.to_string()));
        }

        let body = Arc::new(body);
        {
            let mut cache = self.cache.lock().expect("body cache lock poisoned");
            if cache.len() >= BODY_CACHE_CAP {
                debug!(cap = BODY_CACHE_CAP, "body cache full; clearing");
                cache.clear();
            }
            cache.insert(url.to_string(), Arc::clone(&body));
        }
        Ok(body)
    }
}
