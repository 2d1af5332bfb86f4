//! Aggregation orchestrator
//!
//! Per call:
//! 1. Validate the batch
//! 2. Resolve seeds (concurrently, results kept in input order)
//! 3. Collect candidates song by song in input order into one identity map
//! 4. Global last-resort pass if the map is still empty
//! 5. Rank, diversity-filter, truncate
//! 6. Optional ID enrichment
//!
//! Step 3 is strictly sequential: first-write-wins and the search-fallback
//! gate both depend on merge order matching input order.

use super::collector::CandidateCollector;
use super::dedup::IdentityMap;
use super::diversity;
use super::error::RecommendError;
use super::seed::{SeedOutcome, SeedResolver};
use super::types::{ConversionSummary, InputSong, RecommendRequest, RecommendationResult};
use crate::enrich::{IdConverter, TrackRef};
use crate::provider::MetadataProvider;
use futures::stream::{self, StreamExt};
use songbird_common::config::RecommendConfig;
use std::sync::Arc;
use std::time::Duration;

/// Tuning knobs for [`Aggregator`]
#[derive(Debug, Clone, Copy)]
pub struct AggregatorOptions {
    /// Deadline for each individual provider call
    pub call_timeout: Duration,
    /// Seed searches allowed in flight at once
    pub seed_concurrency: usize,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            seed_concurrency: 4,
        }
    }
}

impl From<&RecommendConfig> for AggregatorOptions {
    fn from(config: &RecommendConfig) -> Self {
        Self {
            call_timeout: Duration::from_millis(config.call_timeout_ms.max(1)),
            seed_concurrency: config.seed_concurrency.max(1),
        }
    }
}

/// Recommendation aggregator
///
/// Holds no per-call state; every [`Aggregator::recommend`] call owns its
/// own identity map.
pub struct Aggregator {
    provider: Arc<dyn MetadataProvider>,
    converter: Option<Arc<dyn IdConverter>>,
    options: AggregatorOptions,
}

impl Aggregator {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            converter: None,
            options: AggregatorOptions::default(),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn IdConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_options(mut self, options: AggregatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn converter(&self) -> Option<&Arc<dyn IdConverter>> {
        self.converter.as_ref()
    }

    /// Produce recommendations for `request`
    ///
    /// # Errors
    /// - `Validation` for an empty batch or a batch with no searchable song
    ///   (no provider call is made)
    /// - `NoRecommendations` when every strategy came up empty
    pub async fn recommend(
        &self,
        request: &RecommendRequest,
    ) -> Result<RecommendationResult, RecommendError> {
        validate(request)?;

        let mode = request.effective_mode();
        let limit = request.effective_limit();
        let provider = self.provider.as_ref();

        tracing::debug!(
            songs = request.songs.len(),
            mode = %mode,
            limit = limit,
            "Processing songs for recommendations"
        );

        let resolver = SeedResolver::new(provider, self.options.call_timeout);
        let pending: Vec<_> = request
            .songs
            .iter()
            .map(|song| resolve_logged(&resolver, song))
            .collect();
        let outcomes: Vec<Option<SeedOutcome>> = stream::iter(pending)
            .buffered(self.options.seed_concurrency.max(1))
            .collect()
            .await;

        let found_songs = outcomes
            .iter()
            .flatten()
            .filter(|outcome| outcome.is_resolved())
            .count();

        let collector = CandidateCollector::new(provider, mode, self.options.call_timeout);
        let mut map = IdentityMap::new();

        for (song, outcome) in request.songs.iter().zip(outcomes) {
            map = match outcome {
                Some(SeedOutcome::Resolved(seed)) => collector.collect_resolved(&seed, map).await,
                Some(SeedOutcome::Unresolved) => collector.collect_unresolved(song, map).await,
                None => map,
            };
        }

        if map.is_empty() {
            tracing::warn!("No tracks found with primary strategies, trying last-resort fallback");
            map = collector.collect_last_resort(&request.songs, map).await;
        }

        if map.is_empty() {
            tracing::info!(songs = request.songs.len(), "No recommendations found");
            return Err(RecommendError::NoRecommendations);
        }

        let candidate_count = map.len();
        let mut recommendations = diversity::apply(diversity::rank(map.into_values()), mode, limit);
        recommendations.truncate(limit);

        tracing::info!(
            mode = %mode,
            input_songs = request.songs.len(),
            found_songs = found_songs,
            candidates = candidate_count,
            recommendations = recommendations.len(),
            "Recommendations assembled"
        );

        Ok(RecommendationResult {
            mode,
            input_songs: request.songs.len(),
            recommendations,
            found_songs,
            conversion: None,
        })
    }

    /// [`Aggregator::recommend`] followed by ID enrichment, when a converter
    /// is configured
    pub async fn recommend_enriched(
        &self,
        request: &RecommendRequest,
    ) -> Result<RecommendationResult, RecommendError> {
        let mut result = self.recommend(request).await?;
        if let Some(converter) = &self.converter {
            enrich(converter.as_ref(), &mut result).await;
        }
        Ok(result)
    }
}

/// Resolve one song; unsearchable songs are logged and skipped
async fn resolve_logged(resolver: &SeedResolver<'_>, song: &InputSong) -> Option<SeedOutcome> {
    match resolver.resolve(song).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::warn!(song = ?song, error = %e, "Skipping song");
            None
        }
    }
}

fn validate(request: &RecommendRequest) -> Result<(), RecommendError> {
    if request.songs.is_empty() {
        return Err(RecommendError::Validation(
            "At least one song is required".to_string(),
        ));
    }

    if !request.songs.iter().any(|song| song.is_searchable()) {
        return Err(RecommendError::Validation(
            "At least one song needs a name, artist or album".to_string(),
        ));
    }

    Ok(())
}

/// Attach external IDs in place
///
/// A converter failure leaves every `external_id` unset and no summary;
/// the recommendations themselves are never dropped.
pub async fn enrich(converter: &dyn IdConverter, result: &mut RecommendationResult) {
    let items: Vec<TrackRef> = result
        .recommendations
        .iter()
        .map(|rec| {
            let artist = Some(rec.artist.clone()).filter(|a| !a.trim().is_empty());
            TrackRef::new(rec.name.clone(), artist)
        })
        .collect();

    match converter.convert_batch(&items).await {
        Ok(ids) => {
            let mut ids = ids.into_iter();
            for rec in result.recommendations.iter_mut() {
                rec.external_id = ids.next().flatten();
            }

            let converted = result
                .recommendations
                .iter()
                .filter(|rec| rec.external_id.is_some())
                .count();

            tracing::info!(converted = converted, total = items.len(), "External ID conversion finished");
            result.conversion = Some(ConversionSummary {
                converted,
                total: items.len(),
            });
        }
        Err(e) => {
            tracing::error!(
                category = %e.category(),
                error = %e,
                "Failed to convert recommendations to external IDs"
            );
        }
    }
}
