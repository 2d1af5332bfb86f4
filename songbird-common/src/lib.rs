//! # Songbird Common Library
//!
//! Shared code for the Songbird services:
//! - Error type used by configuration and startup code
//! - Bootstrap configuration loading (CLI → ENV → TOML → defaults)
//! - HTTP user-agent string

pub mod config;
pub mod error;

pub use config::{get_user_agent, TomlConfig};
pub use error::{Error, Result};
