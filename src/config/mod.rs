//! Configuration management.
//!
//! Configuration is read from `~/.config/fomoscan/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;

use crate::api::ApiConfig;
use crate::scraper::ScraperConfig;
use crate::sync::SyncConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file; defaults to the platform data directory when unset.
    pub db_path: Option<PathBuf>,
    pub sync: SyncConfig,
    pub scraper: ScraperConfig,
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/fomoscan/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("fomoscan").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# fomoscan configuration
#
# Any omitted setting falls back to its default.

# Database file. Defaults to the platform data directory
# (e.g. ~/.local/share/fomoscan/fomoscan.db).
# db_path = "/var/lib/fomoscan/fomoscan.db"

[sync]
# Listing page to discover token URLs from
listing_url = "https://fomo.biz"

# Seconds to sleep between sync rounds
interval_secs = 30

# Total extraction attempts per URL within a round
max_attempts = 2

# Fixed delay between attempts, in seconds
retry_delay_secs = 3

# Rate-limiting delay between processed URLs, in seconds
page_delay_secs = 1

[scraper]
# Run browser in headless mode (no visible window)
headless = true

# How long to wait for a token page's info container, in seconds
container_timeout_secs = 20

# Poll interval while waiting for a selector, in milliseconds
poll_interval_ms = 250

# Settle time between scroll steps on the listing page, in milliseconds
scroll_settle_ms = 2000

# Maximum scroll-to-bottom iterations on the listing page
max_scrolls = 30

# Where to write the discovered-URL snapshot after each discovery pass
snapshot_path = "token_urls.json"

# The site's hashed CSS-module class names change when it redeploys;
# override them here instead of rebuilding.
[scraper.selectors]
container = "._tokenInfoContainer_z5b78_1"
token_name = "._tokenName_z5b78_38"
ticker = "._ticker_z5b78_46"
token_media = "img._tokenMedia_z5b78_23"
creator_link = "._creatorAddress_z5b78_60"
creator_avatar = "._userAvatar_z5b78_174 img"
meta_info = "._metaInfo_z5b78_51 span[title]"
stat_item = "._statItem_z5b78_81"
stat_label = "._statLabel_z5b78_90"
stat_value = "._statValue_z5b78_97"
description = "._tokenDescription_z5b78_105"
token_link_fragment = "/token/"

[api]
# Bind address for the HTTP API
addr = "127.0.0.1:8000"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.sync.listing_url, "https://fomo.biz");
        assert_eq!(config.sync.max_attempts, 2);
        assert_eq!(config.scraper.max_scrolls, 30);
        assert_eq!(config.api.addr, "127.0.0.1:8000");
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[sync]
interval_secs = 120
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom value
        assert_eq!(config.sync.interval_secs, 120);
        // Default values
        assert_eq!(config.sync.max_attempts, 2);
        assert!(config.scraper.headless);
    }

    #[test]
    fn test_empty_config() {
        let content = "";
        let config: Config = toml::from_str(content).expect("Empty config should work");

        assert!(config.db_path.is_none());
        assert_eq!(config.sync.listing_url, "https://fomo.biz");
    }

    #[test]
    fn test_selector_override() {
        let content = r##"
[scraper.selectors]
container = ".tokenInfo"
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.scraper.selectors.container, ".tokenInfo");
        // Untouched selectors keep their defaults.
        assert_eq!(config.scraper.selectors.token_link_fragment, "/token/");
    }
}
