//! Recommendation aggregation engine
//!
//! - [`seed`]: input song → canonical provider track
//! - [`collector`]: cascading fallback strategies per seed
//! - [`dedup`]: first-write-wins identity map
//! - [`diversity`]: mode-dependent selection
//! - [`aggregator`]: orchestration over a whole batch

pub mod aggregator;
pub mod collector;
pub mod dedup;
pub mod diversity;
pub mod error;
pub mod seed;
pub mod types;

pub use aggregator::{Aggregator, AggregatorOptions};
pub use collector::{CandidateCollector, Strategy};
pub use dedup::{identity_key, IdentityMap};
pub use error::{RecommendError, StrategyError};
pub use seed::{Seed, SeedOutcome, SeedResolver};
pub use types::{
    CandidateTrack, ConversionSummary, InputSong, Mode, RecommendRequest, RecommendationResult,
    Tier,
};
