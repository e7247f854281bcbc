use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the browser automation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// How long to wait for a page's token container before giving up
    /// on the extraction pass (default: 20)
    pub container_timeout_secs: u64,

    /// Poll interval while waiting for a selector, in milliseconds
    /// (default: 250)
    pub poll_interval_ms: u64,

    /// Settle time between scroll steps during discovery, in milliseconds
    /// (default: 2000)
    pub scroll_settle_ms: u64,

    /// Maximum scroll-to-bottom iterations on the listing page (default: 30)
    pub max_scrolls: usize,

    /// Where to write the discovered-URL snapshot; None disables it
    pub snapshot_path: Option<PathBuf>,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// CSS selectors for the target site's markup
    pub selectors: Selectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            container_timeout_secs: 20,
            poll_interval_ms: 250,
            scroll_settle_ms: 2000,
            max_scrolls: 30,
            snapshot_path: Some(PathBuf::from("token_urls.json")),
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            selectors: Selectors::default(),
        }
    }
}

impl ScraperConfig {
    pub fn container_timeout(&self) -> Duration {
        Duration::from_secs(self.container_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

/// CSS selectors for the token listing and detail pages.
///
/// Defaults match the site's hashed CSS-module class names; they are
/// configurable because those hashes change when the site redeploys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Top-level marker for a loaded token detail page. If this never
    /// appears, the extraction pass fails as a whole.
    pub container: String,
    pub token_name: String,
    pub ticker: String,
    pub token_media: String,
    pub creator_link: String,
    pub creator_avatar: String,
    pub meta_info: String,
    pub stat_item: String,
    pub stat_label: String,
    pub stat_value: String,
    pub description: String,
    /// Substring of detail-page hrefs on the listing page.
    pub token_link_fragment: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            container: "._tokenInfoContainer_z5b78_1".into(),
            token_name: "._tokenName_z5b78_38".into(),
            ticker: "._ticker_z5b78_46".into(),
            token_media: "img._tokenMedia_z5b78_23".into(),
            creator_link: "._creatorAddress_z5b78_60".into(),
            creator_avatar: "._userAvatar_z5b78_174 img".into(),
            meta_info: "._metaInfo_z5b78_51 span[title]".into(),
            stat_item: "._statItem_z5b78_81".into(),
            stat_label: "._statLabel_z5b78_90".into(),
            stat_value: "._statValue_z5b78_97".into(),
            description: "._tokenDescription_z5b78_105".into(),
            token_link_fragment: "/token/".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ScraperConfig::default();
        assert!(config.headless);
        assert_eq!(config.container_timeout_secs, 20);
        assert_eq!(config.max_scrolls, 30);
        assert_eq!(config.scroll_settle_ms, 2000);
        assert!(config.snapshot_path.is_some());
        assert!(config.user_agent.is_some());
    }

    #[test]
    fn test_durations() {
        let config = ScraperConfig::default();
        assert_eq!(config.container_timeout(), Duration::from_secs(20));
        assert_eq!(config.scroll_settle(), Duration::from_millis(2000));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ScraperConfig = toml::from_str("headless = false").unwrap();
        assert!(!config.headless);
        assert_eq!(config.max_scrolls, 30);
        assert_eq!(config.selectors.token_link_fragment, "/token/");
    }
}
