//! Spice-up (recommendation) endpoints

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::recommend::{
    CandidateTrack, ConversionSummary, Mode, RecommendRequest, RecommendationResult,
};
use crate::AppState;

/// One recommended track
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDto {
    pub name: String,
    pub artist: String,
    pub url: String,
    /// Normalized 0–1 score
    pub match_score: f64,
    /// Omitted on the plain endpoint, `null` when conversion found nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<Option<String>>,
}

impl RecommendationDto {
    fn from_candidate(track: CandidateTrack, with_external_id: bool) -> Self {
        let score = track.score();
        Self {
            name: track.name,
            artist: track.artist,
            url: track.url,
            match_score: score,
            external_id: with_external_id.then_some(track.external_id),
        }
    }
}

/// POST /api/lastfm/spice-up response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiceUpResponse {
    pub mode: Mode,
    pub input_songs: usize,
    pub recommendations: Vec<RecommendationDto>,
    pub found_songs: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deezer_conversion: Option<ConversionSummary>,
}

impl SpiceUpResponse {
    fn from_result(result: RecommendationResult, with_external_id: bool) -> Self {
        Self {
            mode: result.mode,
            input_songs: result.input_songs,
            recommendations: result
                .recommendations
                .into_iter()
                .map(|track| RecommendationDto::from_candidate(track, with_external_id))
                .collect(),
            found_songs: result.found_songs,
            deezer_conversion: result.conversion,
        }
    }
}

/// Query for the `with-deezer` variant
#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    #[serde(default)]
    pub convert: bool,
}

/// POST /api/lastfm/spice-up
pub async fn spice_up(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> ApiResult<Json<SpiceUpResponse>> {
    let result = state.aggregator.recommend(&request).await?;
    Ok(Json(SpiceUpResponse::from_result(result, false)))
}

/// POST /api/lastfm/spice-up/with-deezer?convert=true
///
/// Conversion failures never fail the request; unconverted tracks carry
/// `externalId: null`.
pub async fn spice_up_with_deezer(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
    Json(request): Json<RecommendRequest>,
) -> ApiResult<Json<SpiceUpResponse>> {
    let result = if query.convert {
        state.aggregator.recommend_enriched(&request).await?
    } else {
        state.aggregator.recommend(&request).await?
    };

    tracing::debug!(
        convert = query.convert,
        converted = result.conversion.map(|c| c.converted).unwrap_or(0),
        "Spice-up with Deezer handled"
    );

    Ok(Json(SpiceUpResponse::from_result(result, true)))
}

/// Build recommendation routes
pub fn recommend_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lastfm/spice-up", post(spice_up))
        .route("/api/lastfm/spice-up/with-deezer", post(spice_up_with_deezer))
}
