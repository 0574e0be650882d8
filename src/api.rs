use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::cache::{CacheRead, FeedCache};
use crate::config::AppConfig;
use crate::content::PostContentFetcher;
use crate::error::ContentError;
use crate::model::FeedSnapshot;
use crate::scheduler::RefreshScheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<FeedCache>,
    pub scheduler: Arc<RefreshScheduler>,
    pub content: Arc<PostContentFetcher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/feed/{feed_key}", get(get_feed))
        .route("/feed/{feed_key}/refresh", post(refresh_feed))
        .route("/post-content", get(get_post_content))
        .route("/sources", get(get_sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `X-Feed-Cache` tells clients how the snapshot was obtained:
/// HIT (fresh cache), STALE (expired cache, refresh running in the
/// background), MISS (aggregated inline), REFRESHING (manual refresh
/// already in flight, prior snapshot returned).
fn snapshot_response(cache_state: &'static str, snapshot: &FeedSnapshot) -> Response {
    (
        StatusCode::OK,
        [("X-Feed-Cache", cache_state)],
        Json(snapshot),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Serve the feed with stale-while-revalidate semantics: a fresh snapshot
/// directly, a stale one immediately while a background refresh runs, and
/// only a true miss aggregates inline.
async fn get_feed(State(state): State<AppState>, Path(feed_key): Path<String>) -> Response {
    if state.config.feed(&feed_key).is_none() {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown feed key: {feed_key}"),
        );
    }

    match state.cache.get(&feed_key) {
        CacheRead::Fresh(snapshot) => snapshot_response("HIT", &snapshot),
        CacheRead::Stale(snapshot) => {
            let scheduler = Arc::clone(&state.scheduler);
            let key = feed_key.clone();
            tokio::spawn(async move {
                if let Err(e) = scheduler.run_once(&key).await {
                    tracing::warn!(feed = %key, error = %e, "background revalidation failed");
                }
            });
            snapshot_response("STALE", &snapshot)
        }
        CacheRead::Miss => match state.scheduler.run_once(&feed_key).await {
            Ok(snapshot) => snapshot_response("MISS", &snapshot),
            Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        },
    }
}

/// Manual refresh. If a run is already in flight and we have any prior
/// snapshot, return it immediately instead of blocking on the run.
async fn refresh_feed(State(state): State<AppState>, Path(feed_key): Path<String>) -> Response {
    if state.config.feed(&feed_key).is_none() {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown feed key: {feed_key}"),
        );
    }

    if state.scheduler.is_refreshing(&feed_key) {
        if let Some(prior) = state.cache.last_known(&feed_key) {
            return snapshot_response("REFRESHING", &prior);
        }
    }

    match state.scheduler.run_once(&feed_key).await {
        Ok(snapshot) => snapshot_response("REFRESHED", &snapshot),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

#[derive(serde::Deserialize)]
struct PostContentQuery {
    url: String,
}

async fn get_post_content(
    State(state): State<AppState>,
    Query(q): Query<PostContentQuery>,
) -> Response {
    match state.content.fetch_body(&q.url).await {
        Ok(body) => Json(json!({ "content": body.to_text() })).into_response(),
        Err(ContentError::UnknownSource(url)) => error_response(
            StatusCode::NOT_FOUND,
            format!("no configured source matches url {url}"),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string(), "retryable": true })),
        )
            .into_response(),
    }
}

/// Configured sources and feeds, for diagnostics.
async fn get_sources(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sources: Vec<_> = state
        .config
        .sources
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "displayName": s.display_name,
                "baseUrl": s.base_url,
                "extractor": s.extractor,
            })
        })
        .collect();
    let feeds: Vec<_> = state
        .config
        .feeds
        .iter()
        .map(|f| json!({ "key": f.key, "sources": f.sources }))
        .collect();
    Json(json!({ "sources": sources, "feeds": feeds }))
}
