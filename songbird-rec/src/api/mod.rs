//! HTTP API handlers for songbird-rec

pub mod deezer;
pub mod health;
pub mod recommend;

pub use deezer::deezer_routes;
pub use health::health_routes;
pub use recommend::recommend_routes;
