// src/relay.rs
//! Relay fetch layer: ordered fallback chain over indirection endpoints.
//!
//! The calling environment cannot contact the target sites directly, so
//! every page fetch goes through third-party relay services that wrap the
//! target URL and return its body. Endpoints are tried strictly in order,
//! one at a time, each bounded by its own timeout; the first usable payload
//! wins. This layer is source-agnostic: no per-site logic lives here.

use async_trait::async_trait;
use metrics::counter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::FetchError;

/// Payloads shorter than this are treated as malformed (relay error pages
/// and empty envelopes are all well under it).
const MIN_PAYLOAD_CHARS: usize = 64;

/// Anything that can turn a URL into raw page content. The relay client is
/// the production implementation; tests inject counting or scripted fakes.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct RelayClient {
    client: reqwest::Client,
    relays: Vec<RelayConfig>,
    attempt_timeout: Duration,
    calls: AtomicU64,
}

impl RelayClient {
    pub fn new(relays: Vec<RelayConfig>, attempt_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; onl-aggregator/0.1)")
            .build()
            .expect("reqwest client should build with static options");
        Self {
            client,
            relays,
            attempt_timeout,
            calls: AtomicU64::new(0),
        }
    }

    /// Total `fetch` invocations since construction (diagnostics).
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn relay_url(relay: &RelayConfig, target: &str) -> String {
        if relay.encode_target {
            format!("{}{}", relay.prefix, urlencoding::encode(target))
        } else {
            format!("{}{}", relay.prefix, target)
        }
    }

    async fn attempt(&self, relay: &RelayConfig, target: &str) -> Result<String, String> {
        let url = Self::relay_url(relay, target);
        let resp = self
            .client
            .get(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .timeout(self.attempt_timeout)
            .send()
            .await
            .map_err(|e| format!("request error: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("status {}", resp.status()));
        }

        let body = if relay.json_contents {
            let envelope: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| format!("envelope parse error: {e}"))?;
            match envelope.get("contents").and_then(|v| v.as_str()) {
                Some(contents) => contents.to_string(),
                None => return Err("envelope missing contents".to_string()),
            }
        } else {
            resp.text().await.map_err(|e| format!("body read: {e}"))?
        };

        if body.trim().chars().count() < MIN_PAYLOAD_CHARS {
            return Err("empty or truncated payload".to_string());
        }
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for RelayClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        for relay in &self.relays {
            counter!("relay_attempts_total").increment(1);
            match self.attempt(relay, url).await {
                Ok(body) => {
                    debug!(relay = %relay.prefix, target = %url, bytes = body.len(), "relay fetch ok");
                    return Ok(body);
                }
                Err(reason) => {
                    counter!("relay_attempt_errors_total").increment(1);
                    warn!(relay = %relay.prefix, target = %url, %reason, "relay attempt failed; advancing");
                }
            }
        }

        counter!("relay_exhausted_total").increment(1);
        Err(FetchError::RelaysExhausted {
            url: url.to_string(),
            attempts: self.relays.len(),
        })
    }
}
