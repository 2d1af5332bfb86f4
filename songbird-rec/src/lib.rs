//! songbird-rec library interface
//!
//! Exposes the recommendation engine, provider clients and HTTP router for
//! the binary and for integration tests.

pub mod api;
pub mod enrich;
pub mod error;
pub mod provider;
pub mod recommend;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use enrich::CatalogSearch;
use recommend::Aggregator;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Recommendation engine (carries the optional ID converter)
    pub aggregator: Arc<Aggregator>,
    /// Raw catalog search, present when Deezer is enabled
    pub catalog: Option<Arc<dyn CatalogSearch>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            catalog: None,
            startup_time: Utc::now(),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSearch>) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::recommend_routes())
        .merge(api::deezer_routes())
        .merge(api::health_routes())
        .with_state(state)
}
