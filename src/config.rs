//! Configuration loading and types for pagemill.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files and the environment (`load`)

mod load;
mod types;

use std::path::PathBuf;

pub use load::EnvOverrides;
pub use types::{SiteConfig, SiteSettings, WatchConfig};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to encode config file path as a unicode string: {0}")]
    EncodePath(PathBuf),

    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] config::ConfigError),

    #[error("{0}")]
    Validation(String),
}
