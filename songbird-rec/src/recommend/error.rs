//! Recommendation error types

use super::collector::Strategy;
use crate::provider::ProviderError;
use thiserror::Error;

/// Errors surfaced to callers of the aggregator
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Empty batch, or no song with a searchable field
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Every song, strategy and the last-resort pass came up empty
    #[error("Could not find any tracks. Please check your song information and try different songs or artists.")]
    NoRecommendations,
}

/// A single strategy step failed; absorbed by the collector
#[derive(Debug, Error)]
#[error("{strategy} strategy failed: {source}")]
pub struct StrategyError {
    pub strategy: Strategy,
    #[source]
    pub source: ProviderError,
}

impl StrategyError {
    pub fn new(strategy: Strategy, source: ProviderError) -> Self {
        Self { strategy, source }
    }
}
