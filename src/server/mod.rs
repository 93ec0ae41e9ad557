//! HTTP API layer. Thin plumbing over the feed and search modules.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/search?q=` | Keyword search; empty `q` = latest episodes |
//! | `GET` | `/api/episodes?limit=&offset=` | Latest episodes, unhighlighted |
//! | `GET` | `/api/refresh` | Fetch + ingest cycle through the TTL cache |
//! | `GET` | `/api/debug/episode/{number}` | Per-episode extraction diagnostics |
//!
//! Handler errors become a uniform `{message}` JSON body: 404 for unknown
//! episodes, 500 for everything else. The refresh endpoint answers with
//! `{success, message, episodeCount?}` instead.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::database::{Database, Episode, SearchResult, ShowNote};
use crate::error::AppError;
use crate::extract::extract_links_with_bare_urls;
use crate::feed::{run_refresh, RefreshCache};
use crate::search;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    /// Guards the feed fetch window and serializes refresh cycles.
    pub refresh_cache: Arc<tokio::sync::Mutex<RefreshCache>>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        let refresh_cache = Arc::new(tokio::sync::Mutex::new(RefreshCache::new(
            config.cache_ttl(),
        )));
        Self {
            db,
            config: Arc::new(config),
            refresh_cache,
        }
    }
}

/// Starts the HTTP server. Runs until the process is terminated.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.bind.clone();

    if state.config.initial_refresh {
        // Fire-and-forget: a failed initial fetch is logged, not fatal.
        let warm = state.clone();
        tokio::spawn(async move {
            match run_refresh(&warm.db, &warm.config, &warm.refresh_cache).await {
                Ok(outcome) => tracing::info!(
                    "Initial refresh done: {} episodes in store",
                    outcome.episode_count
                ),
                Err(e) => tracing::error!("Initial podcast data fetch failed: {}", e),
            }
        });
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    tracing::info!("Server listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(handle_search))
        .route("/api/episodes", get(handle_episodes))
        .route("/api/refresh", get(handle_refresh))
        .route("/api/debug/episode/{number}", get(handle_debug_episode))
        .with_state(state)
}

// ============ Error response ============

/// Uniform JSON error body.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============ /api/search ============

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let query = params.q.unwrap_or_default();
    tracing::info!("Search query: \"{}\"", query);
    let results = search::search_episodes(&state.db, &query)?;
    Ok(Json(results))
}

// ============ /api/episodes ============

#[derive(Deserialize)]
struct PageParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn handle_episodes(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 50);
    let offset = params.offset.unwrap_or(0).max(0);
    let results = search::latest_episodes(&state.db, limit, offset)?;
    Ok(Json(results))
}

// ============ /api/refresh ============

async fn handle_refresh(State(state): State<AppState>) -> Response {
    match run_refresh(&state.db, &state.config, &state.refresh_cache).await {
        Ok(outcome) => {
            let message = if outcome.skipped {
                "Podcast data still fresh, refresh skipped"
            } else {
                "Podcast data refreshed successfully"
            };
            Json(json!({
                "success": true,
                "message": message,
                "episodeCount": outcome.episode_count,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("Error refreshing podcast data: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

// ============ /api/debug/episode/{number} ============

/// One extracted link attributed to its owning note, bare URLs included
/// (display context, unlike the searchable anchor-only set).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugLink {
    title: String,
    url: String,
    link_text: String,
}

/// Which episode fields contain the configured probe query.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainsQuery {
    query: String,
    title: bool,
    show_note_titles: bool,
    show_note_contents: bool,
    links: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugEpisodeResponse {
    episode: Episode,
    show_notes: Vec<ShowNote>,
    links: Vec<DebugLink>,
    contains_query: ContainsQuery,
}

async fn handle_debug_episode(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<DebugEpisodeResponse>, AppError> {
    let episode = state
        .db
        .get_episode_by_number(&number)?
        .ok_or_else(|| AppError::NotFound(format!("episode #{}", number)))?;
    let show_notes = state.db.get_show_notes(episode.id)?;

    let mut links = Vec::new();
    for note in &show_notes {
        for link in extract_links_with_bare_urls(&note.content) {
            links.push(DebugLink {
                title: note.title.clone(),
                url: link.url,
                link_text: link.text,
            });
        }
    }

    let probe = state.config.debug_probe_query.to_lowercase();
    let contains_query = ContainsQuery {
        title: episode.title.to_lowercase().contains(&probe),
        show_note_titles: show_notes
            .iter()
            .any(|n| n.title.to_lowercase().contains(&probe)),
        show_note_contents: show_notes
            .iter()
            .any(|n| n.content.to_lowercase().contains(&probe)),
        links: links
            .iter()
            .any(|l| l.link_text.to_lowercase().contains(&probe)),
        query: state.config.debug_probe_query.clone(),
    };

    Ok(Json(DebugEpisodeResponse {
        episode,
        show_notes,
        links,
        contains_query,
    }))
}
