//! Candidate collection: the cascading fallback policy
//!
//! For a resolved seed the strategies in [`Strategy::RESOLVED_CHAIN`] run in
//! order. Between steps the orchestrator evaluates each strategy's gate
//! against the current [`GateState`]. A failing step is logged and counts
//! as zero candidates; collection always moves on.

use super::dedup::IdentityMap;
use super::error::StrategyError;
use super::seed::Seed;
use super::types::{CandidateTrack, InputSong, Mode, Tier};
use crate::provider::{with_deadline, MetadataProvider, ProviderTrack};
use std::fmt;
use std::time::Duration;

/// Search fallback runs while the global map holds fewer entries than this
pub const SEARCH_FALLBACK_THRESHOLD: usize = 3;
/// Top tracks requested per artist in the last-resort pass
pub const LAST_RESORT_FETCH: usize = 10;
/// Top tracks kept per artist in the last-resort pass
pub const LAST_RESORT_KEEP: usize = 5;

/// Candidate-gathering strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Tracks similar to the seed
    Similar,
    /// Seed artist's top tracks
    ArtistTop,
    /// Remaining hits of the seed search
    SearchFallback,
    /// Top tracks for the artist of a song that did not resolve
    UnresolvedArtist,
    /// Global pass when nothing else produced candidates
    LastResort,
}

impl Strategy {
    /// Order applied to every resolved seed
    pub const RESOLVED_CHAIN: [Strategy; 3] =
        [Strategy::Similar, Strategy::ArtistTop, Strategy::SearchFallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Similar => "similar-tracks",
            Strategy::ArtistTop => "artist-top-tracks",
            Strategy::SearchFallback => "search-fallback",
            Strategy::UnresolvedArtist => "unresolved-artist",
            Strategy::LastResort => "last-resort",
        }
    }

    /// Gating predicate evaluated before running the strategy
    pub fn is_eligible(&self, state: &GateState) -> bool {
        match self {
            Strategy::Similar => true,
            Strategy::ArtistTop => state.similar_yield == 0 && state.seed_has_artist,
            Strategy::SearchFallback => state.map_len < SEARCH_FALLBACK_THRESHOLD,
            Strategy::UnresolvedArtist | Strategy::LastResort => true,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the gates see between strategy steps
#[derive(Debug, Clone, Copy, Default)]
pub struct GateState {
    /// Candidates returned by the similarity step for this seed
    pub similar_yield: usize,
    /// Entries in the shared identity map
    pub map_len: usize,
    pub seed_has_artist: bool,
}

fn candidate(track: &ProviderTrack, tier: Tier) -> CandidateTrack {
    CandidateTrack {
        name: track.name.clone(),
        artist: track.artist.clone(),
        url: track.url.clone(),
        mbid: track.mbid.clone(),
        tier,
        external_id: None,
    }
}

/// Runs strategies against the provider for one aggregation call
pub struct CandidateCollector<'a> {
    provider: &'a dyn MetadataProvider,
    mode: Mode,
    call_timeout: Duration,
}

impl<'a> CandidateCollector<'a> {
    pub fn new(provider: &'a dyn MetadataProvider, mode: Mode, call_timeout: Duration) -> Self {
        Self {
            provider,
            mode,
            call_timeout,
        }
    }

    fn list_limit(&self) -> usize {
        self.mode.similar_tracks_limit()
    }

    /// Run one step of [`Strategy::RESOLVED_CHAIN`] for a seed
    ///
    /// The unresolved-artist and last-resort passes work on input songs, not
    /// seeds; see [`Self::collect_unresolved`] and [`Self::collect_last_resort`].
    /// Asked for either here, nothing is fetched.
    pub async fn run(&self, strategy: Strategy, seed: &Seed) -> Result<Vec<CandidateTrack>, StrategyError> {
        match strategy {
            Strategy::Similar => self.similar(seed).await,
            Strategy::ArtistTop => self.artist_top(seed).await,
            Strategy::SearchFallback => Ok(self.search_fallback(seed)),
            Strategy::UnresolvedArtist | Strategy::LastResort => {
                tracing::debug!(strategy = %strategy, "Not a seed strategy, skipping");
                Ok(Vec::new())
            }
        }
    }

    async fn similar(&self, seed: &Seed) -> Result<Vec<CandidateTrack>, StrategyError> {
        let call = self
            .provider
            .get_similar_tracks(&seed.track.artist, &seed.track.name, self.list_limit());
        let tracks = with_deadline(self.call_timeout, call)
            .await
            .map_err(|e| StrategyError::new(Strategy::Similar, e))?;

        tracing::debug!(
            artist = %seed.track.artist,
            track = %seed.track.name,
            count = tracks.len(),
            "Similar tracks fetched"
        );

        Ok(tracks
            .iter()
            .enumerate()
            .map(|(rank, t)| candidate(t, Tier::similarity(t.match_score, rank)))
            .collect())
    }

    async fn artist_top(&self, seed: &Seed) -> Result<Vec<CandidateTrack>, StrategyError> {
        tracing::debug!(artist = %seed.track.artist, "Fallback: artist top tracks");

        let call = self
            .provider
            .get_artist_top_tracks(&seed.track.artist, self.list_limit(), 1);
        let tracks = with_deadline(self.call_timeout, call)
            .await
            .map_err(|e| StrategyError::new(Strategy::ArtistTop, e))?;

        Ok(tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_same_track(&seed.track))
            .map(|(rank, t)| candidate(t, Tier::ArtistTop(rank)))
            .collect())
    }

    fn search_fallback(&self, seed: &Seed) -> Vec<CandidateTrack> {
        tracing::debug!(artist = %seed.track.artist, "Fallback: using search results directly");

        seed.alternatives()
            .iter()
            .take(self.list_limit())
            .enumerate()
            .map(|(rank, t)| candidate(t, Tier::SearchFallback(rank)))
            .collect()
    }

    async fn unresolved_artist(&self, artist: &str) -> Result<Vec<CandidateTrack>, StrategyError> {
        tracing::debug!(artist = %artist, "Fallback: top tracks for unresolved song's artist");

        let call = self
            .provider
            .get_artist_top_tracks(artist, self.list_limit(), 1);
        let tracks = with_deadline(self.call_timeout, call)
            .await
            .map_err(|e| StrategyError::new(Strategy::UnresolvedArtist, e))?;

        Ok(tracks
            .iter()
            .enumerate()
            .map(|(rank, t)| candidate(t, Tier::ArtistFallback(rank)))
            .collect())
    }

    async fn last_resort(&self, artist: &str) -> Result<Vec<CandidateTrack>, StrategyError> {
        let info = with_deadline(self.call_timeout, self.provider.get_artist_info(artist))
            .await
            .map_err(|e| StrategyError::new(Strategy::LastResort, e))?;

        if info.is_none() {
            tracing::debug!(artist = %artist, "Last resort: artist unknown to provider");
            return Ok(Vec::new());
        }

        let call = self
            .provider
            .get_artist_top_tracks(artist, LAST_RESORT_FETCH, 1);
        let tracks = with_deadline(self.call_timeout, call)
            .await
            .map_err(|e| StrategyError::new(Strategy::LastResort, e))?;

        Ok(tracks
            .iter()
            .take(LAST_RESORT_KEEP)
            .enumerate()
            .map(|(rank, t)| candidate(t, Tier::LastResort(rank)))
            .collect())
    }

    /// Log a failed step and substitute an empty candidate list
    fn absorb(result: Result<Vec<CandidateTrack>, StrategyError>) -> Vec<CandidateTrack> {
        result.unwrap_or_else(|e| {
            tracing::warn!(
                strategy = %e.strategy,
                category = %e.source.category(),
                error = %e.source,
                "Strategy failed, continuing with no candidates"
            );
            Vec::new()
        })
    }

    /// Run the resolved-seed chain, folding every yield into `map`
    pub async fn collect_resolved(&self, seed: &Seed, mut map: IdentityMap) -> IdentityMap {
        let mut state = GateState {
            similar_yield: 0,
            map_len: map.len(),
            seed_has_artist: !seed.track.artist.trim().is_empty(),
        };

        for strategy in Strategy::RESOLVED_CHAIN {
            if !strategy.is_eligible(&state) {
                continue;
            }

            let candidates = Self::absorb(self.run(strategy, seed).await);
            if strategy == Strategy::Similar {
                state.similar_yield = candidates.len();
            }

            map = map.merge_all(candidates);
            state.map_len = map.len();
        }

        map
    }

    /// Song without a seed: fall back on its artist, if any
    pub async fn collect_unresolved(&self, song: &InputSong, map: IdentityMap) -> IdentityMap {
        match song.artist() {
            Some(artist) => {
                let candidates = Self::absorb(self.unresolved_artist(artist).await);
                map.merge_all(candidates)
            }
            None => map,
        }
    }

    /// Global last-resort pass over every song with an artist
    pub async fn collect_last_resort(&self, songs: &[InputSong], mut map: IdentityMap) -> IdentityMap {
        for artist in songs.iter().filter_map(InputSong::artist) {
            let candidates = Self::absorb(self.last_resort(artist).await);
            map = map.merge_all(candidates);
        }
        map
    }
}
