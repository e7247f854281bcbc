use std::collections::HashSet;
use std::fs;

use tracing::{debug, info, warn};
use url::Url;

use crate::app::{FomoError, Result};
use crate::scraper::{Browser, ScraperConfig};

/// Discovers token detail URLs from the infinite-scrolling listing page.
///
/// Drives progressive loading by scrolling to the bottom, waiting a fixed
/// settle interval and re-measuring the content height, stopping early once
/// the height stops growing or after the iteration cap. Returns the
/// deduplicated set of detail URLs currently visible.
pub struct LinkDiscoverer {
    config: ScraperConfig,
}

impl LinkDiscoverer {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    pub async fn discover<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        listing_url: &str,
    ) -> Result<HashSet<String>> {
        browser.goto(listing_url).await?;
        self.scroll_to_end(browser).await?;

        let urls = self.collect_links(browser).await?;
        info!(count = urls.len(), "discovered token URLs");

        // Non-authoritative side channel for inspection; sync state lives
        // in the ledger.
        if let Some(ref path) = self.config.snapshot_path {
            let mut sorted: Vec<&String> = urls.iter().collect();
            sorted.sort();
            match serde_json::to_string_pretty(&sorted) {
                Ok(json) => {
                    if let Err(e) = fs::write(path, json) {
                        warn!(path = %path.display(), error = %e, "failed to write URL snapshot");
                    }
                }
                Err(e) => warn!(error = %e, "failed to serialize URL snapshot"),
            }
        }

        Ok(urls)
    }

    async fn scroll_to_end<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<()> {
        let mut last_height = self.content_height(browser).await?;

        for step in 0..self.config.max_scrolls {
            browser
                .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await?;
            tokio::time::sleep(self.config.scroll_settle()).await;

            let new_height = self.content_height(browser).await?;
            debug!(step, last_height, new_height, "scroll step");
            if new_height == last_height {
                break;
            }
            last_height = new_height;
        }

        Ok(())
    }

    async fn content_height<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<i64> {
        let value = browser.evaluate("document.body.scrollHeight").await?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .ok_or_else(|| FomoError::Discovery(format!("listing height is not a number: {}", value)))
    }

    async fn collect_links<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<HashSet<String>> {
        let selector = format!(
            "a[href*=\"{}\"]",
            self.config.selectors.token_link_fragment
        );
        let quoted = serde_json::to_string(&selector)
            .map_err(|e| FomoError::Discovery(format!("bad link selector: {}", e)))?;
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(a => a.href)",
            quoted
        );

        let value = browser.evaluate(&script).await?;
        let hrefs: Vec<String> = serde_json::from_value(value)
            .map_err(|e| FomoError::Discovery(format!("unexpected link collection result: {}", e)))?;

        let mut urls = HashSet::new();
        for href in hrefs {
            match Url::parse(&href) {
                Ok(parsed) => {
                    urls.insert(parsed.to_string());
                }
                Err(e) => warn!(href = href.as_str(), error = %e, "skipping unparseable link"),
            }
        }

        Ok(urls)
    }
}
