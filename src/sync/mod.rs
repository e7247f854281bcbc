//! The incremental synchronization pipeline.
//!
//! One round: discover candidate URLs from the listing page, diff them
//! against the sync ledger, extract each new URL sequentially with bounded
//! retries, and commit successes atomically. [`SyncEngine::run_forever`]
//! repeats rounds on a fixed interval for the lifetime of the process; no
//! error terminates the loop.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::app::Result;
use crate::domain::{TokenExtract, TokenRecord};
use crate::scraper::{Browser, LinkDiscoverer, ScraperConfig, TokenExtractor};
use crate::store::Store;

/// Sync loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Listing page to discover token URLs from
    pub listing_url: String,

    /// Seconds to sleep between rounds (default: 30)
    pub interval_secs: u64,

    /// Total extraction attempts per URL within a round (default: 2)
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds (default: 3)
    pub retry_delay_secs: u64,

    /// Rate-limiting delay between processed URLs, in seconds (default: 1)
    pub page_delay_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://fomo.biz".into(),
            interval_secs: 30,
            max_attempts: 2,
            retry_delay_secs: 3,
            page_delay_secs: 1,
        }
    }
}

/// Counts for one completed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// URLs that were new relative to the ledger this round.
    pub processed: usize,
    /// Tokens committed this round.
    pub added: usize,
    /// URLs that exhausted their attempts or failed to commit; they stay
    /// un-ledgered and become candidates again next round.
    pub failed: usize,
}

enum ItemOutcome {
    Added,
    AlreadySynced,
    GaveUp,
}

pub struct SyncEngine<B: Browser, S: Store> {
    browser: B,
    store: Arc<S>,
    extractor: TokenExtractor,
    discoverer: LinkDiscoverer,
    config: SyncConfig,
}

impl<B: Browser, S: Store> SyncEngine<B, S> {
    pub fn new(browser: B, store: Arc<S>, scraper: ScraperConfig, config: SyncConfig) -> Self {
        Self {
            browser,
            store,
            extractor: TokenExtractor::new(scraper.clone()),
            discoverer: LinkDiscoverer::new(scraper),
            config,
        }
    }

    /// Execute one discover → diff → extract → commit round.
    ///
    /// Per-item failures are contained; only a discovery failure aborts
    /// the round and propagates to the caller.
    pub async fn run_once(&mut self) -> Result<SyncReport> {
        let candidates = self
            .discoverer
            .discover(&mut self.browser, &self.config.listing_url)
            .await?;
        let ledgered = self.store.synced_urls()?;

        let mut new_urls: Vec<String> = candidates.difference(&ledgered).cloned().collect();
        // Discovery order is not meaningful; sort for deterministic logs.
        new_urls.sort();

        info!(
            candidates = candidates.len(),
            new = new_urls.len(),
            "discovery complete"
        );

        let mut report = SyncReport {
            processed: new_urls.len(),
            added: 0,
            failed: 0,
        };

        for (idx, url) in new_urls.iter().enumerate() {
            info!("syncing token {}/{}: {}", idx + 1, new_urls.len(), url);

            match self.sync_one(url).await {
                Ok(ItemOutcome::Added) => report.added += 1,
                Ok(ItemOutcome::AlreadySynced) => {}
                Ok(ItemOutcome::GaveUp) => {
                    report.failed += 1;
                    warn!(url = url.as_str(), "giving up on token for this round");
                }
                Err(e) if e.is_session() => {
                    report.failed += 1;
                    warn!(url = url.as_str(), error = %e, "automation session lost, recreating");
                    self.recover_session().await;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(url = url.as_str(), error = %e, "failed to sync token");
                }
            }

            sleep(Duration::from_secs(self.config.page_delay_secs)).await;
        }

        Ok(report)
    }

    /// Run rounds forever, sleeping the configured interval between them.
    pub async fn run_forever(&mut self) {
        loop {
            match self.run_once().await {
                Ok(report) => info!(
                    processed = report.processed,
                    added = report.added,
                    failed = report.failed,
                    "sync round complete"
                ),
                Err(e) => {
                    // Round-level failure: log, skip to the next round.
                    error!(error = %e, "sync round failed");
                    if e.is_session() {
                        self.recover_session().await;
                    }
                }
            }

            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    /// Replace a dead automation session. Failure is logged, not fatal;
    /// the next use of the browser will surface it again.
    pub async fn recover_session(&mut self) {
        if let Err(e) = self.browser.restart().await {
            error!(error = %e, "failed to recreate browser session");
        }
    }

    /// Process one URL: extract with bounded retries, then commit the
    /// record and ledger entry as one unit.
    async fn sync_one(&mut self, url: &str) -> Result<ItemOutcome> {
        for attempt in 1..=self.config.max_attempts {
            match self.attempt(url).await {
                Ok(extract) if extract.is_complete() => {
                    let record = TokenRecord::from_extract(extract)?;
                    return if self.store.insert_token(&record)? {
                        info!(url, ticker = record.display_ticker(), "added token");
                        Ok(ItemOutcome::Added)
                    } else {
                        debug!(url, "already ledgered, skipping");
                        Ok(ItemOutcome::AlreadySynced)
                    };
                }
                Ok(extract) => warn!(
                    url,
                    attempt,
                    max = self.config.max_attempts,
                    error = extract.error.as_deref().unwrap_or("incomplete data"),
                    "extraction incomplete"
                ),
                Err(e) if e.is_session() => return Err(e),
                Err(e) => warn!(url, attempt, error = %e, "extraction attempt failed"),
            }

            if attempt < self.config.max_attempts {
                sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
            }
        }

        // Not ledgered: eligible again in the next round's diff.
        Ok(ItemOutcome::GaveUp)
    }

    async fn attempt(&mut self, url: &str) -> Result<TokenExtract> {
        self.browser.goto(url).await?;
        self.extractor.extract(&mut self.browser, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::scraper::testing::FakeBrowser;
    use crate::store::SqliteStore;

    const LISTING: &str = "https://fomo.biz/";

    fn test_engine(browser: FakeBrowser) -> SyncEngine<FakeBrowser, SqliteStore> {
        let scraper = ScraperConfig {
            scroll_settle_ms: 0,
            poll_interval_ms: 0,
            snapshot_path: None,
            ..Default::default()
        };
        let config = SyncConfig {
            listing_url: LISTING.into(),
            retry_delay_secs: 0,
            page_delay_secs: 0,
            ..Default::default()
        };
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        SyncEngine::new(browser, store, scraper, config)
    }

    fn token_body(name_label: &str, market_cap: &str) -> serde_json::Value {
        json!({
            "name_label": name_label,
            "logo_url": "https://fomo.biz/logo.png",
            "creator_link": "https://fomo.biz/profile/0xabc",
            "creator_name": "maker",
            "times": [{ "title": "09/03/2024, 14:05:00", "text": "2h ago" }],
            "stats": [
                { "label": "MC", "value": market_cap },
                { "label": "Replies", "value": "3" }
            ],
            "description": "a token",
        })
    }

    fn listing_browser(urls: &[&str]) -> FakeBrowser {
        let mut browser = FakeBrowser::new();
        browser.listing_heights = vec![100, 100];
        browser.listing_links = urls.iter().map(|u| u.to_string()).collect();
        browser
    }

    #[tokio::test]
    async fn test_round_commits_new_tokens() {
        let a = "https://fomo.biz/token/a";
        let b = "https://fomo.biz/token/b";
        let mut browser = listing_browser(&[a, b]);
        browser.add_page(a, true, token_body("Alpha (ALP)", "$1.5K"));
        browser.add_page(b, true, token_body("Beta (BET)", "$2M"));

        let mut engine = test_engine(browser);
        let report = engine.run_once().await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                processed: 2,
                added: 2,
                failed: 0
            }
        );
        assert_eq!(engine.store.token_count().unwrap(), 2);
        assert!(engine.store.is_synced(a).unwrap());
        assert!(engine.store.is_synced(b).unwrap());

        let alpha = engine.store.token(a).unwrap().unwrap();
        assert_eq!(alpha.name, "Alpha");
        assert_eq!(alpha.ticker, Some("ALP".into()));
        assert_eq!(alpha.market_cap, Some(1500.0));
        assert_eq!(alpha.replies, 3);
        assert_eq!(alpha.creator_address, Some("0xabc".into()));
    }

    #[tokio::test]
    async fn test_second_round_is_idempotent() {
        let a = "https://fomo.biz/token/a";
        let mut browser = listing_browser(&[a]);
        browser.add_page(a, true, token_body("Alpha (ALP)", "$300"));

        let mut engine = test_engine(browser);
        let first = engine.run_once().await.unwrap();
        assert_eq!(first.added, 1);

        let second = engine.run_once().await.unwrap();
        assert_eq!(
            second,
            SyncReport {
                processed: 0,
                added: 0,
                failed: 0
            }
        );
        assert_eq!(engine.store.token_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incremental_round_adds_only_new() {
        let a = "https://fomo.biz/token/a";
        let b = "https://fomo.biz/token/b";
        let c = "https://fomo.biz/token/c";
        let mut browser = listing_browser(&[a, b]);
        browser.add_page(a, true, token_body("Alpha (ALP)", "$100"));
        browser.add_page(b, true, token_body("Beta (BET)", "$200"));

        let mut engine = test_engine(browser);
        engine.run_once().await.unwrap();

        engine.browser.listing_links.push(c.to_string());
        engine
            .browser
            .add_page(c, true, token_body("Gamma (GAM)", "$300"));

        let report = engine.run_once().await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                processed: 1,
                added: 1,
                failed: 0
            }
        );
        assert_eq!(engine.store.token_count().unwrap(), 3);
        assert!(engine.store.is_synced(c).unwrap());
    }

    #[tokio::test]
    async fn test_retry_exhaustion_defers_to_next_round() {
        let c = "https://fomo.biz/token/c";
        let mut browser = listing_browser(&[c]);
        // Container never appears: every attempt times out.
        browser.add_page(c, false, json!(null));

        let mut engine = test_engine(browser);
        let report = engine.run_once().await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                processed: 1,
                added: 0,
                failed: 1
            }
        );
        assert_eq!(engine.browser.attempts_for(c), 2);
        assert!(!engine.store.is_synced(c).unwrap());
        assert!(engine.store.token(c).unwrap().is_none());

        // Never ledgered, so the next round retries it.
        let report = engine.run_once().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(engine.browser.attempts_for(c), 4);
    }

    #[tokio::test]
    async fn test_malformed_market_cap_fails_only_that_item() {
        let a = "https://fomo.biz/token/a";
        let b = "https://fomo.biz/token/b";
        let mut browser = listing_browser(&[a, b]);
        browser.add_page(a, true, token_body("Alpha (ALP)", "$100"));
        browser.add_page(b, true, token_body("Beta (BET)", "not-a-number"));

        let mut engine = test_engine(browser);
        let report = engine.run_once().await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                processed: 2,
                added: 1,
                failed: 1
            }
        );
        assert!(engine.store.is_synced(a).unwrap());
        assert!(!engine.store.is_synced(b).unwrap());
    }

    #[tokio::test]
    async fn test_session_failure_recreates_browser_and_continues() {
        let a = "https://fomo.biz/token/a";
        let b = "https://fomo.biz/token/b";
        let c = "https://fomo.biz/token/c";
        let mut browser = listing_browser(&[a, b, c]);
        browser.add_page(a, true, token_body("Alpha (ALP)", "$100"));
        browser.session_failures.insert(b.to_string());
        browser.add_page(c, true, token_body("Gamma (GAM)", "$300"));

        let mut engine = test_engine(browser);
        let report = engine.run_once().await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                processed: 3,
                added: 2,
                failed: 1
            }
        );
        assert_eq!(engine.browser.restarts, 1);
        assert!(engine.store.is_synced(a).unwrap());
        assert!(engine.store.is_synced(c).unwrap());
    }

    #[tokio::test]
    async fn test_discovery_failure_aborts_round() {
        let mut browser = listing_browser(&[]);
        browser.session_failures.insert(LISTING.to_string());

        let mut engine = test_engine(browser);
        assert!(engine.run_once().await.is_err());
        assert_eq!(engine.store.token_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_then_success_within_round() {
        // Name missing on the page body; the extract is incomplete and the
        // engine retries. The fake serves the same body both times, so the
        // item is given up this round.
        let a = "https://fomo.biz/token/a";
        let mut browser = listing_browser(&[a]);
        browser.add_page(a, true, json!({ "stats": [], "times": [] }));

        let mut engine = test_engine(browser);
        let report = engine.run_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(engine.browser.attempts_for(a), 2);
    }
}
