//! Error taxonomy for the aggregation engine.
//!
//! Fetch and aggregation errors are `Clone` because a coalesced refresh run
//! hands the same result to every waiting caller.

use thiserror::Error;

/// Failures of the relay fetch layer.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Every relay endpoint in the chain failed for this URL.
    #[error("all {attempts} relay endpoints failed for {url}")]
    RelaysExhausted { url: String, attempts: usize },

    /// The source was still pending when the run budget elapsed.
    #[error("run budget elapsed before the source responded")]
    BudgetExceeded,
}

/// Feed-level aggregation failures.
#[derive(Debug, Clone, Error)]
pub enum AggregateError {
    #[error("unknown feed key: {0}")]
    UnknownFeed(String),

    /// Every configured source failed in this run. The cache is left
    /// untouched so stale data, if any, remains servable.
    #[error("every source failed for feed {feed_key}")]
    AllSourcesFailed { feed_key: String },
}

/// Per-request failures when fetching a single post body.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no configured source matches url {0}")]
    UnknownSource(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("post body not found at {0}")]
    BodyNotFound(String),
}
