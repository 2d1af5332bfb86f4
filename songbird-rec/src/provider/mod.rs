//! Music-metadata provider abstraction
//!
//! The recommendation engine only talks to a provider through
//! [`MetadataProvider`]. The concrete Last.fm client lives in [`lastfm`].

pub mod lastfm;

pub use lastfm::{LastfmClient, LastfmSettings};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Track as returned by a provider list call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTrack {
    pub name: String,
    pub artist: String,
    pub url: String,
    /// MusicBrainz ID when the provider knows it
    pub mbid: Option<String>,
    /// Raw similarity value (only populated by similar-track lookups)
    pub match_score: Option<f64>,
}

impl ProviderTrack {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            url: String::new(),
            mbid: None,
            match_score: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_match(mut self, score: f64) -> Self {
        self.match_score = Some(score);
        self
    }

    /// Case-insensitive comparison on (name, artist)
    pub fn is_same_track(&self, other: &ProviderTrack) -> bool {
        self.name.to_lowercase() == other.name.to_lowercase()
            && self.artist.to_lowercase() == other.artist.to_lowercase()
    }
}

/// Artist metadata (existence check)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub name: String,
    pub mbid: Option<String>,
    pub url: String,
}

/// Error category reported for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    AuthFailed,
    Forbidden,
    RateLimited,
    NoResponse,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InvalidRequest => "invalid-request",
            ErrorCategory::AuthFailed => "auth-failed",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::RateLimited => "rate-limited",
            ErrorCategory::NoResponse => "no-response",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider client errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid provider request: {0}")]
    InvalidRequest(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider access forbidden: {0}")]
    Forbidden(String),

    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("No response from provider: {0}")]
    NoResponse(String),

    #[error("Provider call exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            ProviderError::AuthFailed(_) => ErrorCategory::AuthFailed,
            ProviderError::Forbidden(_) => ErrorCategory::Forbidden,
            ProviderError::RateLimited => ErrorCategory::RateLimited,
            ProviderError::NoResponse(_) | ProviderError::Timeout(_) => ErrorCategory::NoResponse,
            ProviderError::NotFound(_) | ProviderError::Api(..) | ProviderError::Parse(_) => {
                ErrorCategory::Unknown
            }
        }
    }

    /// Map a bare HTTP status (no structured error body) to an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => ProviderError::InvalidRequest(body),
            401 => ProviderError::AuthFailed(body),
            403 => ProviderError::Forbidden(body),
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited,
            _ => ProviderError::Api(status, body),
        }
    }
}

/// Collaborator operations consumed by the recommendation engine
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Free-text track search
    async fn search_tracks(&self, query: &str, limit: usize)
        -> Result<Vec<ProviderTrack>, ProviderError>;

    /// Tracks similar to (artist, track), best match first
    async fn get_similar_tracks(
        &self,
        artist: &str,
        track: &str,
        limit: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError>;

    /// Artist's most popular tracks, most popular first
    async fn get_artist_top_tracks(
        &self,
        artist: &str,
        limit: usize,
        page: usize,
    ) -> Result<Vec<ProviderTrack>, ProviderError>;

    /// `Ok(None)` when the provider does not know the artist
    async fn get_artist_info(&self, artist: &str) -> Result<Option<ArtistInfo>, ProviderError>;
}

/// Bound a provider call by `deadline`; overrunning is reported as
/// [`ProviderError::Timeout`].
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(deadline)),
    }
}
