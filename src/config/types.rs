//! Configuration type definitions.
//!
//! This module contains the data structures read from `pagemill.yaml`.
//! These types are pure data - no I/O or complex logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Base URL used for canonical links when neither the config file nor
/// `SITE_URL` provides one.
pub const DEFAULT_SITE_URL: &str = "http://www.mazurka.io";

// =============================================================================
// Root configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSettings,
    /// Pages root, relative to the config file
    #[serde(default = "default_pages")]
    pub pages: PathBuf,
    /// Tera templates directory, relative to the config file
    #[serde(default = "default_templates")]
    pub templates: PathBuf,
    /// Parent template used when a page does not name one
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    /// Development-specific settings (watch mode, etc.)
    #[serde(default)]
    pub dev: DevConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: SiteSettings::default(),
            pages: default_pages(),
            templates: default_templates(),
            layout: default_layout(),
            markdown: MarkdownConfig::default(),
            dev: DevConfig::default(),
        }
    }
}

fn default_pages() -> PathBuf {
    PathBuf::from("src/modules/pages")
}

fn default_templates() -> PathBuf {
    PathBuf::from("templates")
}

fn default_layout() -> String {
    "layout.html".to_string()
}

// =============================================================================
// Site settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub name: Option<String>,
    /// Base URL for canonical links (`SITE_URL` overrides)
    #[serde(default = "default_url")]
    pub url: String,
    /// Public asset path prefix (`CDN_URL` overrides)
    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            name: None,
            url: default_url(),
            cdn_url: default_cdn_url(),
            output: default_output(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_SITE_URL.to_string()
}

fn default_cdn_url() -> String {
    "/".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("_site")
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Class prefix for fenced code blocks (`lang-rust`, ...)
    #[serde(default = "default_class_prefix")]
    pub class_prefix: String,
    /// Content block used when a page's front matter has no `block`
    #[serde(default = "default_block")]
    pub block: String,
}

fn default_class_prefix() -> String {
    "lang-".to_string()
}

fn default_block() -> String {
    "main".to_string()
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            class_prefix: default_class_prefix(),
            block: default_block(),
        }
    }
}

// =============================================================================
// Development configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfig {
    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,
    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
