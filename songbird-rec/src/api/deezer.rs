//! Deezer ID conversion endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::enrich::{CatalogSearch, DeezerSearchResponse, IdConverter, TrackRef};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/deezer/tracks/convert request
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub tracks: Vec<TrackRef>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedTrack {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub deezer_id: Option<String>,
}

/// POST /api/deezer/tracks/convert response
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub converted: usize,
    pub total: usize,
    pub tracks: Vec<ConvertedTrack>,
}

/// GET /api/deezer/track/find-id query
#[derive(Debug, Deserialize)]
pub struct FindIdQuery {
    #[serde(default)]
    pub name: String,
    pub artist: Option<String>,
}

/// GET /api/deezer/search/tracks query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

/// Deezer's own page size cap
const DEFAULT_SEARCH_LIMIT: usize = 25;

fn catalog(state: &AppState) -> ApiResult<&Arc<dyn CatalogSearch>> {
    state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Deezer integration is disabled".to_string()))
}

fn converter(state: &AppState) -> ApiResult<&Arc<dyn IdConverter>> {
    state
        .aggregator
        .converter()
        .ok_or_else(|| ApiError::ServiceUnavailable("Deezer integration is disabled".to_string()))
}

/// POST /api/deezer/tracks/convert
pub async fn convert_tracks(
    State(state): State<AppState>,
    Json(request): Json<ConvertRequest>,
) -> ApiResult<Json<ConvertResponse>> {
    if request.tracks.is_empty() {
        return Err(ApiError::BadRequest("At least one track is required".to_string()));
    }

    let converter = converter(&state)?;
    let ids = converter.convert_batch(&request.tracks).await?;

    let tracks: Vec<ConvertedTrack> = request
        .tracks
        .into_iter()
        .zip(ids.into_iter().chain(std::iter::repeat(None)))
        .map(|(track, deezer_id)| ConvertedTrack {
            name: track.name,
            artist: track.artist,
            deezer_id,
        })
        .collect();

    let converted = tracks.iter().filter(|t| t.deezer_id.is_some()).count();

    Ok(Json(ConvertResponse {
        converted,
        total: tracks.len(),
        tracks,
    }))
}

/// GET /api/deezer/track/find-id?name=..&artist=..
pub async fn find_track_id(
    State(state): State<AppState>,
    Query(query): Query<FindIdQuery>,
) -> ApiResult<Json<ConvertedTrack>> {
    let converter = converter(&state)?;
    let deezer_id = converter.find_id(&query.name, query.artist.as_deref()).await?;

    Ok(Json(ConvertedTrack {
        name: query.name,
        artist: query.artist,
        deezer_id,
    }))
}

/// GET /api/deezer/search/tracks?query=..&limit=..
///
/// Passes the Deezer search page through unchanged.
pub async fn search_tracks(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<DeezerSearchResponse>> {
    if query.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Search query cannot be empty".to_string()));
    }

    let catalog = catalog(&state)?;
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let response = catalog.search_tracks(&query.query, limit).await?;

    Ok(Json(response))
}

/// Build Deezer routes
pub fn deezer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/deezer/search/tracks", get(search_tracks))
        .route("/api/deezer/tracks/convert", post(convert_tracks))
        .route("/api/deezer/track/find-id", get(find_track_id))
}
