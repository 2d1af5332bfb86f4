//! Deezer API client
//!
//! Public search endpoint only; no authentication required.
//!
//! API Documentation: https://developers.deezer.com/api/search

use super::{CatalogSearch, IdConverter};
use crate::provider::ProviderError;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use songbird_common::TomlConfig;
use std::num::NonZeroU32;
use std::time::Duration;

/// Deezer caps search pages at 25
const MAX_SEARCH_LIMIT: usize = 25;

/// Deezer connection settings
#[derive(Debug, Clone)]
pub struct DeezerSettings {
    pub base_url: String,
    pub requests_per_second: u32,
    pub timeout: Duration,
}

impl Default for DeezerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deezer.com".to_string(),
            requests_per_second: 10,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Deezer search hit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeezerTrack {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: Option<DeezerArtist>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeezerArtist {
    #[serde(default)]
    pub name: String,
}

/// Deezer search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeezerSearchResponse {
    #[serde(default)]
    pub data: Vec<DeezerTrack>,
    #[serde(default)]
    pub total: u64,
}

/// Deezer API client
pub struct DeezerClient {
    http_client: Client,
    base_url: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl DeezerClient {
    pub fn new(settings: DeezerSettings) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .user_agent(songbird_common::get_user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::NoResponse(e.to_string()))?;

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: settings.base_url,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// `Ok(None)` when Deezer is disabled in configuration
    pub fn from_config(config: &TomlConfig) -> songbird_common::Result<Option<Self>> {
        if !config.deezer.enabled {
            return Ok(None);
        }

        let settings = DeezerSettings {
            base_url: config.deezer.base_url.clone(),
            requests_per_second: config.deezer.requests_per_second,
            timeout: Duration::from_millis(config.recommend.call_timeout_ms.max(1)),
        };

        Self::new(settings)
            .map(Some)
            .map_err(|e| songbird_common::Error::Internal(e.to_string()))
    }

    /// Search tracks by free-text or advanced (`artist:".." track:".."`) query
    pub async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<DeezerSearchResponse, ProviderError> {
        if query.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "Search query cannot be empty".to_string(),
            ));
        }

        self.rate_limiter.until_ready().await;

        let url = format!("{}/search", self.base_url);
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT).to_string();
        tracing::debug!(query = %query, "Searching Deezer");

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::NoResponse(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NoResponse(e.to_string()))?;

        let value: Option<Value> = serde_json::from_str(&body).ok();

        if let Some(error) = value.as_ref().and_then(api_error) {
            return Err(error);
        }

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let value = value.ok_or_else(|| ProviderError::Parse("Deezer returned non-JSON body".to_string()))?;
        serde_json::from_value(value).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Find the Deezer track ID for (name, artist)
    ///
    /// Prefers a case-insensitive exact title (and artist) match, otherwise
    /// returns the first hit.
    pub async fn find_track_id(
        &self,
        name: &str,
        artist: Option<&str>,
    ) -> Result<Option<u64>, ProviderError> {
        if name.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("Track name is required".to_string()));
        }

        let artist = artist.filter(|a| !a.trim().is_empty());
        let query = match artist {
            Some(artist) => format!("artist:\"{}\" track:\"{}\"", artist, name),
            None => format!("track:\"{}\"", name),
        };

        let tracks = match self.search_tracks(&query, 5).await {
            Ok(response) => response.data,
            Err(ProviderError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(pick_match(&tracks, name, artist))
    }
}

fn pick_match(tracks: &[DeezerTrack], name: &str, artist: Option<&str>) -> Option<u64> {
    let name = name.to_lowercase();
    let artist = artist.map(str::to_lowercase);

    let exact = tracks.iter().find(|track| {
        track.title.to_lowercase() == name
            && artist.as_ref().map_or(true, |a| {
                track.artist.as_ref().map(|ta| ta.name.to_lowercase()).as_ref() == Some(a)
            })
    });

    match exact {
        Some(track) => {
            tracing::debug!(id = track.id, title = %track.title, "Found exact Deezer match");
            Some(track.id)
        }
        None => tracks.first().map(|track| {
            tracing::debug!(id = track.id, title = %track.title, "Found approximate Deezer match");
            track.id
        }),
    }
}

/// Map `{"error": {"code": .., "message": ..}}` to a typed error
fn api_error(value: &Value) -> Option<ProviderError> {
    let error = value.get("error")?;
    let code = error.get("code").and_then(Value::as_u64).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();

    Some(match code {
        4 => ProviderError::RateLimited,
        200 | 300 => ProviderError::AuthFailed(message),
        500 | 501 => ProviderError::InvalidRequest(message),
        800 => ProviderError::NotFound(message),
        other => ProviderError::Api(u16::try_from(other).unwrap_or(u16::MAX), message),
    })
}

#[async_trait]
impl IdConverter for DeezerClient {
    async fn find_id(
        &self,
        name: &str,
        artist: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        let id = self.find_track_id(name, artist).await?;
        if id.is_none() {
            tracing::warn!(
                track = %name,
                artist = %artist.unwrap_or("unknown artist"),
                "No Deezer track found"
            );
        }
        Ok(id.map(|id| id.to_string()))
    }
}

#[async_trait]
impl CatalogSearch for DeezerClient {
    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<DeezerSearchResponse, ProviderError> {
        DeezerClient::search_tracks(self, query, limit).await
    }
}
