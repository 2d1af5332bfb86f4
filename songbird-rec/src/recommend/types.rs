//! Recommendation data model

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Default number of recommendations
pub const DEFAULT_LIMIT: usize = 20;
/// Hard cap on recommendations per request
pub const MAX_LIMIT: usize = 100;

/// User-supplied song
///
/// At least one field must be non-blank for the song to be searchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSong {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl InputSong {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Non-blank fields in search order: name, artist, album
    pub fn search_terms(&self) -> Vec<&str> {
        [Some(self.name.as_str()), self.artist.as_deref(), self.album.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .collect()
    }

    pub fn is_searchable(&self) -> bool {
        !self.search_terms().is_empty()
    }

    /// Artist, if present and non-blank
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Diversity mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Strict,
    #[default]
    Normal,
    Diverse,
}

impl Mode {
    /// Upper bound for per-seed provider list calls
    pub fn similar_tracks_limit(self) -> usize {
        match self {
            Mode::Strict => 10,
            Mode::Normal => 20,
            Mode::Diverse => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Strict => "strict",
            Mode::Normal => "normal",
            Mode::Diverse => "diverse",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Mode::Strict),
            "normal" => Ok(Mode::Normal),
            "diverse" => Ok(Mode::Diverse),
            other => Err(format!("Unknown mode: {}", other)),
        }
    }
}

/// Provenance of a candidate, ordered by decreasing trust
///
/// Every variant yields a score on the same 0–1 scale (synthetic tiers may
/// dip below zero at deep ranks).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tier {
    /// Provider similarity, normalized to 0–1
    Similarity(f64),
    /// Seed artist's top track at `rank`
    ArtistTop(usize),
    /// Leftover seed search result at `rank`
    SearchFallback(usize),
    /// Top track of an unresolved song's artist at `rank`
    ArtistFallback(usize),
    /// Global last-resort pass at `rank`
    LastResort(usize),
}

impl Tier {
    /// Similarity tier from a provider value
    ///
    /// Values above 1 are percentages. Without a value, the score descends
    /// from 1.0 by 0.01 per rank.
    pub fn similarity(provider_match: Option<f64>, rank: usize) -> Self {
        let normalized = match provider_match.filter(|m| m.is_finite()) {
            Some(m) if m > 1.0 => m / 100.0,
            Some(m) => m,
            None => synthetic(100, rank),
        };
        Tier::Similarity(normalized.clamp(0.0, 1.0))
    }

    pub fn score(&self) -> f64 {
        match *self {
            Tier::Similarity(value) => value,
            Tier::ArtistTop(rank) => synthetic(50, rank),
            Tier::SearchFallback(rank) => synthetic(40, rank),
            Tier::ArtistFallback(rank) => synthetic(30, rank),
            Tier::LastResort(rank) => synthetic(20, rank),
        }
    }

    /// Trust rank; higher is more trusted
    pub fn trust(&self) -> u8 {
        match self {
            Tier::Similarity(_) => 4,
            Tier::ArtistTop(_) => 3,
            Tier::SearchFallback(_) => 2,
            Tier::ArtistFallback(_) => 1,
            Tier::LastResort(_) => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Similarity(_) => "similarity",
            Tier::ArtistTop(_) => "artist-top",
            Tier::SearchFallback(_) => "search-fallback",
            Tier::ArtistFallback(_) => "artist-fallback",
            Tier::LastResort(_) => "last-resort",
        }
    }

    /// Total order used for the final ranking: score, then trust.
    /// `Greater` means `self` ranks ahead of `other`.
    pub fn ranking(&self, other: &Tier) -> Ordering {
        self.score()
            .total_cmp(&other.score())
            .then_with(|| self.trust().cmp(&other.trust()))
    }
}

/// `(base - rank) / 100`, kept in integer hundredths until the end
fn synthetic(base_hundredths: i64, rank: usize) -> f64 {
    let rank = i64::try_from(rank).unwrap_or(i64::MAX / 2);
    (base_hundredths - rank) as f64 / 100.0
}

/// Scored, provenance-tagged recommendation candidate
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTrack {
    pub name: String,
    pub artist: String,
    pub url: String,
    pub mbid: Option<String>,
    pub tier: Tier,
    /// Secondary catalog ID, set only by enrichment
    pub external_id: Option<String>,
}

impl CandidateTrack {
    pub fn new(name: impl Into<String>, artist: impl Into<String>, tier: Tier) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            url: String::new(),
            mbid: None,
            tier,
            external_id: None,
        }
    }

    pub fn score(&self) -> f64 {
        self.tier.score()
    }

    pub fn identity_key(&self) -> String {
        super::dedup::identity_key(&self.artist, &self.name)
    }
}

/// Aggregation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub songs: Vec<InputSong>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RecommendRequest {
    pub fn new(songs: Vec<InputSong>) -> Self {
        Self {
            songs,
            mode: None,
            limit: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn effective_mode(&self) -> Mode {
        self.mode.unwrap_or_default()
    }

    /// Requested limit; zero or missing means the default, capped at [`MAX_LIMIT`]
    pub fn effective_limit(&self) -> usize {
        self.limit
            .filter(|&limit| limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }
}

/// Outcome of the optional enrichment step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub converted: usize,
    pub total: usize,
}

/// Aggregation result
#[derive(Debug, Clone)]
pub struct RecommendationResult {
    pub mode: Mode,
    pub input_songs: usize,
    pub recommendations: Vec<CandidateTrack>,
    /// Songs whose seed search found a match
    pub found_songs: usize,
    /// Present only when enrichment ran to completion
    pub conversion: Option<ConversionSummary>,
}
