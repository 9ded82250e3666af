//! Configuration loading from files and environment variables.
//!
//! Sources are layered with the `config` crate: built-in defaults, then
//! `pagemill.yaml` (optional), then `SITE_URL` / `CDN_URL`.

use std::path::Path;

use config::{Config, File, FileFormat};

use super::{ConfigError, SiteConfig};

/// Environment variables that override the config file.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// `SITE_URL`
    pub site_url: Option<String>,
    /// `CDN_URL`
    pub cdn_url: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self {
            site_url: non_empty_var("SITE_URL"),
            cdn_url: non_empty_var("CDN_URL"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl SiteConfig {
    /// Load the config from a file path, applying environment overrides.
    ///
    /// A missing file is not an error: defaults and overrides still apply.
    pub fn load_from_file(path: &Path, env: &EnvOverrides) -> Result<Self, ConfigError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::EncodePath(path.to_path_buf()))?;

        let settings = Config::builder()
            .add_source(File::new(path_str, FileFormat::Yaml).required(false))
            .set_override_option("site.url", env.site_url.clone())?
            .set_override_option("site.cdn_url", env.cdn_url.clone())?
            .build()?;

        let config: SiteConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'layout' must name a template".to_string(),
            ));
        }
        if self.markdown.block.trim().is_empty() {
            return Err(ConfigError::Validation(
                "invalid config: 'markdown.block' must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
