//! Last.fm API client
//!
//! Implements [`MetadataProvider`] on top of the Last.fm 2.0 web service.
//!
//! API Documentation: https://www.last.fm/api

use super::{ArtistInfo, MetadataProvider, ProviderError, ProviderTrack};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use songbird_common::config::{resolve_lastfm_api_key, resolve_lastfm_shared_secret};
use songbird_common::TomlConfig;
use std::num::NonZeroU32;
use std::time::Duration;

/// `track.search` refuses larger pages
const MAX_SEARCH_LIMIT: usize = 30;
/// `track.getSimilar` / `artist.getTopTracks` upper bound
const MAX_LIST_LIMIT: usize = 1000;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Connection settings for [`LastfmClient`]
#[derive(Debug, Clone)]
pub struct LastfmSettings {
    pub api_key: String,
    /// When set, every request carries an `api_sig`
    pub shared_secret: Option<String>,
    pub base_url: String,
    pub requests_per_second: u32,
    /// Whole-request timeout on the HTTP client
    pub timeout: Duration,
}

impl LastfmSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            shared_secret: None,
            base_url: "https://ws.audioscrobbler.com/2.0".to_string(),
            requests_per_second: 5,
            timeout: Duration::from_secs(15),
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// Last.fm collapses one-element lists into a bare object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Search results carry the artist as a string, list calls as an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtistField {
    Name(String),
    Object(ArtistRef),
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    #[serde(default)]
    name: String,
}

impl ArtistField {
    fn into_name(self) -> String {
        match self {
            ArtistField::Name(name) => name,
            ArtistField::Object(artist) => artist.name,
        }
    }
}

/// `match` arrives as a JSON number or a numeric string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LfmTrack {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist: Option<ArtistField>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    mbid: Option<String>,
    #[serde(rename = "match", default)]
    match_score: Option<Numeric>,
}

impl From<LfmTrack> for ProviderTrack {
    fn from(track: LfmTrack) -> Self {
        ProviderTrack {
            name: track.name,
            artist: track.artist.map(ArtistField::into_name).unwrap_or_default(),
            url: track.url,
            mbid: track.mbid.filter(|m| !m.is_empty()),
            match_score: track.match_score.as_ref().and_then(Numeric::as_f64),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TrackList {
    #[serde(default)]
    track: Option<OneOrMany<LfmTrack>>,
}

impl TrackList {
    fn into_tracks(self) -> Vec<ProviderTrack> {
        self.track
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(ProviderTrack::from)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    trackmatches: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
struct SimilarEnvelope {
    #[serde(default)]
    similartracks: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
struct TopTracksEnvelope {
    #[serde(default)]
    toptracks: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
struct ArtistEnvelope {
    artist: Option<LfmArtist>,
}

#[derive(Debug, Deserialize)]
struct LfmArtist {
    #[serde(default)]
    name: String,
    #[serde(default)]
    mbid: Option<String>,
    #[serde(default)]
    url: String,
}

// ============================================================================
// Client
// ============================================================================

/// Last.fm API client
///
/// Rate limited client-side with a token bucket; every method waits for a
/// permit before sending.
pub struct LastfmClient {
    http_client: Client,
    settings: LastfmSettings,
    rate_limiter: DirectRateLimiter,
}

impl LastfmClient {
    pub fn new(settings: LastfmSettings) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .user_agent(songbird_common::get_user_agent())
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProviderError::NoResponse(e.to_string()))?;

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            http_client,
            settings,
            rate_limiter,
        })
    }

    /// Create client from bootstrap configuration
    ///
    /// Fails when no API key is configured.
    pub fn from_config(config: &TomlConfig) -> songbird_common::Result<Self> {
        let mut settings = LastfmSettings::new(resolve_lastfm_api_key(config)?);
        settings.shared_secret = resolve_lastfm_shared_secret(config);
        settings.base_url = config.lastfm.base_url.clone();
        settings.requests_per_second = config.lastfm.requests_per_second;
        settings.timeout = Duration::from_millis(config.recommend.call_timeout_ms.max(1));

        Self::new(settings).map_err(|e| songbird_common::Error::Internal(e.to_string()))
    }

    /// Build the full query: method params, `api_key`, optional `api_sig`, `format`
    fn build_query(&self, method: &str, params: &[(&str, String)]) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = Vec::with_capacity(params.len() + 4);
        query.push(("method".to_string(), method.to_string()));
        query.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));
        query.push(("api_key".to_string(), self.settings.api_key.clone()));

        if let Some(secret) = &self.settings.shared_secret {
            let signature = sign(&query, secret);
            query.push(("api_sig".to_string(), signature));
        }

        query.push(("format".to_string(), "json".to_string()));
        query
    }

    async fn request(&self, method: &str, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        self.rate_limiter.until_ready().await;

        let query = self.build_query(method, params);
        tracing::debug!(method = %method, "Making Last.fm API request");

        let response = self
            .http_client
            .get(&self.settings.base_url)
            .query(&query)
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
            tracing::debug!(method = %method, error = %error, "Last.fm API returned an error");
            return Err(error);
        }

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        value.ok_or_else(|| ProviderError::Parse(format!("{} returned non-JSON body", method)))
    }
}

/// `api_sig`: md5 of `key+value` pairs sorted by key, then the shared secret.
/// `format` and `callback` are never signed.
fn sign(params: &[(String, String)], secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "format" && k != "callback")
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut payload = String::new();
    for (key, value) in sorted {
        payload.push_str(key);
        payload.push_str(value);
    }
    payload.push_str(secret);

    format!("{:x}", md5::compute(payload.as_bytes()))
}

/// Map a `{"error": code, "message": ..}` body to a typed error
fn api_error(value: &Value) -> Option<ProviderError> {
    let code = value.get("error")?.as_u64()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();

    Some(match code {
        6 => ProviderError::NotFound(message),
        4 | 9 | 10 | 26 => ProviderError::AuthFailed(message),
        17 => ProviderError::Forbidden(message),
        29 => ProviderError::RateLimited,
        2 | 3 | 5 | 7 | 27 => ProviderError::InvalidRequest(message),
        other => ProviderError::Api(u16::try_from(other).unwrap_or(u16::MAX), message),
    })
}

fn parse<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> Result<T, ProviderError> {
    serde_json::from_value(value).map_err(|e| ProviderError::Parse(format!("{}: {}", method, e)))
}

fn require(value: &str, what: &str) -> Result<(), ProviderError> {
    if value.trim().is_empty() {
        return Err(ProviderError::InvalidRequest(format!("{} is required", what)));
    }
    Ok(())
}

#[async_trait]
impl MetadataProvider for LastfmClient {
    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError> {
        if query.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "Search query cannot be empty".to_string(),
            ));
        }

        let params = [
            ("track", query.to_string()),
            ("limit", limit.min(MAX_SEARCH_LIMIT).to_string()),
            ("page", "1".to_string()),
        ];
        let value = self.request("track.search", &params).await?;
        let envelope: SearchEnvelope = parse("track.search", value)?;

        Ok(envelope
            .results
            .and_then(|r| r.trackmatches)
            .map(TrackList::into_tracks)
            .unwrap_or_default())
    }

    async fn get_similar_tracks(
        &self,
        artist: &str,
        track: &str,
        limit: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError> {
        require(artist, "Artist")?;
        require(track, "Track")?;

        let params = [
            ("artist", artist.to_string()),
            ("track", track.to_string()),
            ("limit", limit.min(MAX_LIST_LIMIT).to_string()),
        ];
        let value = self.request("track.getSimilar", &params).await?;
        let envelope: SimilarEnvelope = parse("track.getSimilar", value)?;

        Ok(envelope
            .similartracks
            .map(TrackList::into_tracks)
            .unwrap_or_default())
    }

    async fn get_artist_top_tracks(
        &self,
        artist: &str,
        limit: usize,
        page: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError> {
        require(artist, "Artist")?;

        let params = [
            ("artist", artist.to_string()),
            ("limit", limit.min(MAX_LIST_LIMIT).to_string()),
            ("page", page.max(1).to_string()),
        ];
        let value = self.request("artist.getTopTracks", &params).await?;
        let envelope: TopTracksEnvelope = parse("artist.getTopTracks", value)?;

        Ok(envelope
            .toptracks
            .map(TrackList::into_tracks)
            .unwrap_or_default())
    }

    async fn get_artist_info(&self, artist: &str) -> Result<Option<ArtistInfo>, ProviderError> {
        require(artist, "Artist")?;

        let params = [("artist", artist.to_string())];
        let value = match self.request("artist.getInfo", &params).await {
            Ok(value) => value,
            Err(ProviderError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let envelope: ArtistEnvelope = parse("artist.getInfo", value)?;

        Ok(envelope.artist.map(|a| ArtistInfo {
            name: a.name,
            mbid: a.mbid.filter(|m| !m.is_empty()),
            url: a.url,
        }))
    }
}
