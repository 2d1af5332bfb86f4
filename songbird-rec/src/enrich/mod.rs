//! Secondary-catalog ID enrichment
//!
//! Maps recommended tracks to identifiers in a second catalog. Failures are
//! always per item: a track that cannot be converted gets `None`.

pub mod deezer;

pub use deezer::{DeezerClient, DeezerSearchResponse, DeezerSettings, DeezerTrack};

use crate::provider::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Track reference handed to a converter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl TrackRef {
    pub fn new(name: impl Into<String>, artist: Option<String>) -> Self {
        Self {
            name: name.into(),
            artist,
        }
    }
}

/// Converts tracks to IDs in an external catalog
#[async_trait]
pub trait IdConverter: Send + Sync {
    /// Look up one track; `Ok(None)` when the catalog has no match
    async fn find_id(&self, name: &str, artist: Option<&str>)
        -> Result<Option<String>, ProviderError>;

    /// Convert a batch in input order
    ///
    /// Per-item errors are logged and become `None`; the batch is never
    /// aborted. An `Err` means the catalog as a whole is unusable.
    async fn convert_batch(&self, items: &[TrackRef]) -> Result<Vec<Option<String>>, ProviderError> {
        tracing::debug!("Converting {} tracks to external IDs", items.len());

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            match self.find_id(&item.name, item.artist.as_deref()).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    tracing::warn!(
                        track = %item.name,
                        category = %e.category(),
                        error = %e,
                        "Failed to convert track"
                    );
                    ids.push(None);
                }
            }
        }

        Ok(ids)
    }
}

/// Free-text track search over the external catalog
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<DeezerSearchResponse, ProviderError>;
}
