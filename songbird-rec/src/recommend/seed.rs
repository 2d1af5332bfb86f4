//! Seed resolution: input song → canonical provider track

use super::error::RecommendError;
use super::types::InputSong;
use crate::provider::{with_deadline, MetadataProvider, ProviderTrack};
use std::time::Duration;

/// Number of search hits requested per song
pub const SEED_SEARCH_LIMIT: usize = 5;

/// A resolved seed together with the search page it came from
#[derive(Debug, Clone)]
pub struct Seed {
    /// First search hit
    pub track: ProviderTrack,
    /// Full search page, seed at index 0
    pub search_results: Vec<ProviderTrack>,
}

impl Seed {
    /// Search hits after the seed itself
    pub fn alternatives(&self) -> &[ProviderTrack] {
        self.search_results.get(1..).unwrap_or(&[])
    }
}

/// Result of resolving one song
#[derive(Debug, Clone)]
pub enum SeedOutcome {
    Resolved(Seed),
    /// Searched, but the provider had nothing (or failed)
    Unresolved,
}

impl SeedOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, SeedOutcome::Resolved(_))
    }
}

/// `name artist album`, skipping blank fields
pub fn build_query(song: &InputSong) -> Option<String> {
    let terms = song.search_terms();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Resolves input songs through provider track search
pub struct SeedResolver<'a> {
    provider: &'a dyn MetadataProvider,
    call_timeout: Duration,
}

impl<'a> SeedResolver<'a> {
    pub fn new(provider: &'a dyn MetadataProvider, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// Resolve one song
    ///
    /// # Errors
    /// `RecommendError::Validation` only when the song has no searchable
    /// field. Provider failures resolve to [`SeedOutcome::Unresolved`].
    pub async fn resolve(&self, song: &InputSong) -> Result<SeedOutcome, RecommendError> {
        let query = build_query(song).ok_or_else(|| {
            RecommendError::Validation("Song has no searchable fields".to_string())
        })?;

        let search = self.provider.search_tracks(&query, SEED_SEARCH_LIMIT);
        match with_deadline(self.call_timeout, search).await {
            Ok(results) if !results.is_empty() => {
                let track = results[0].clone();
                tracing::debug!(
                    query = %query,
                    artist = %track.artist,
                    track = %track.name,
                    "Resolved seed track"
                );
                Ok(SeedOutcome::Resolved(Seed {
                    track,
                    search_results: results,
                }))
            }
            Ok(_) => {
                tracing::warn!(query = %query, "No results found for song");
                Ok(SeedOutcome::Unresolved)
            }
            Err(e) => {
                tracing::warn!(
                    query = %query,
                    category = %e.category(),
                    error = %e,
                    "Seed search failed"
                );
                Ok(SeedOutcome::Unresolved)
            }
        }
    }
}
