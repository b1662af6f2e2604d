//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/oasync/config.toml)
//! 3. Environment variables (OASYNC_* prefix)
//!
//! Environment variables take precedence over config file values. Command
//! line flags are applied on top by the CLI, after which [`Config::normalized`]
//! fixes up incomplete store URLs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::DEFAULT_TIMEOUT_SECS;

/// Environment variable prefix
const ENV_PREFIX: &str = "OASYNC";

/// Default annotation store endpoint
pub const DEFAULT_ANNOTATION_URL: &str = "http://127.0.0.1:5005/annotations/";

/// Default document store endpoint
pub const DEFAULT_DOCUMENT_URL: &str = "http://127.0.0.1:5005/documents/";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Annotation store URL that annotations are POSTed to
    #[serde(default = "default_annotation_url")]
    pub annotation_url: String,

    /// Document store URL for target texts (uploads disabled when unset)
    #[serde(default = "default_document_url")]
    pub document_url: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            annotation_url: default_annotation_url(),
            document_url: default_document_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (OASYNC_ANNOTATION_URL, OASYNC_DOCUMENT_URL, OASYNC_TIMEOUT_SECS)
    /// 2. Config file (~/.config/oasync/config.toml or OASYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // OASYNC_ANNOTATION_URL
        if let Ok(val) = std::env::var(format!("{}_ANNOTATION_URL", ENV_PREFIX)) {
            self.annotation_url = val;
        }

        // OASYNC_DOCUMENT_URL
        if let Ok(val) = std::env::var(format!("{}_DOCUMENT_URL", ENV_PREFIX)) {
            self.document_url = if val.is_empty() { None } else { Some(val) };
        }

        // OASYNC_TIMEOUT_SECS
        if let Ok(val) = std::env::var(format!("{}_TIMEOUT_SECS", ENV_PREFIX)) {
            match val.parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => warn!("ignoring invalid {}_TIMEOUT_SECS: {}", ENV_PREFIX, val),
            }
        }
    }

    /// Fix potentially incomplete store URLs, warning about each change
    ///
    /// Target names are joined onto the document store URL, so it has to
    /// end in a slash. An empty document store URL disables uploads.
    pub fn normalized(mut self) -> Self {
        self.document_url = self.document_url.filter(|url| !url.is_empty()).map(|mut url| {
            if !url.ends_with('/') {
                warn!("adding \"/\" to docurl {}", url);
                url.push('/');
            }
            url
        });

        if !has_scheme(&self.annotation_url) {
            warn!("adding \"http://\" to url {}", self.annotation_url);
            self.annotation_url = ensure_scheme(&self.annotation_url);
        }

        if let Some(url) = self.document_url.as_mut() {
            if !has_scheme(url) {
                warn!("adding \"http://\" to docurl {}", url);
                *url = ensure_scheme(url);
            }
        }

        self
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the config file path
    ///
    /// Can be overridden with OASYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oasync")
            .join("config.toml")
    }
}

/// Check for an explicit http or https scheme
///
/// URL parsers read "example.org:80/foo" as scheme "example.org", so only
/// these two prefixes count.
pub fn has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Prepend `http://` to a URL that lacks a scheme
pub fn ensure_scheme(url: &str) -> String {
    if has_scheme(url) {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

fn default_annotation_url() -> String {
    DEFAULT_ANNOTATION_URL.to_string()
}

fn default_document_url() -> Option<String> {
    Some(DEFAULT_DOCUMENT_URL.to_string())
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
