use std::path::{Path, PathBuf};

use crate::build::{Builder, base_path_from_config};
use crate::config::{EnvOverrides, SiteConfig};

pub mod build;
pub mod clean;
pub mod init;
pub mod routes;
pub mod serve;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pagemill.yaml";

/// Resolve the config file path against the working directory.
///
/// Existing files are canonicalized so that page paths match the paths
/// reported by the file watcher.
fn config_path(config_file: Option<&Path>) -> Result<PathBuf, anyhow::Error> {
    let config_path = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    let config_path = if config_path.is_relative() {
        std::env::current_dir()?.join(config_path)
    } else {
        config_path.to_path_buf()
    };
    Ok(config_path.canonicalize().unwrap_or(config_path))
}

/// Load the config and create a builder rooted at the config file's directory.
fn load_builder(config_path: &Path) -> Result<Builder, anyhow::Error> {
    let config = SiteConfig::load_from_file(config_path, &EnvOverrides::from_env())?;
    let base_path = base_path_from_config(config_path);
    Ok(Builder::new(config, base_path))
}
