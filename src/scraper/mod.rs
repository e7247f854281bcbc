//! Browser automation layer for the token listing and detail pages.
//!
//! The sync engine depends only on the narrow [`Browser`] capability set:
//! navigate, bounded wait for a selector, script evaluation, and wholesale
//! session restart. [`ChromeBrowser`] implements it with headless Chrome
//! via chromiumoxide; tests substitute a scripted fake.

mod chrome;
mod config;
mod discover;
mod extractor;

pub use chrome::ChromeBrowser;
pub use config::{ScraperConfig, Selectors};
pub use discover::LinkDiscoverer;
pub use extractor::TokenExtractor;

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;

/// Narrow contract over the rendering/automation session.
///
/// One implementor instance is one stateful browser session; callers must
/// not run two navigations concurrently (methods take `&mut self`).
#[async_trait]
pub trait Browser: Send {
    /// Navigate to a URL and wait for the navigation to finish.
    ///
    /// Errors from this method are session-level: the underlying driver
    /// could not complete a navigation at all.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Wait up to `timeout` for a selector to appear.
    ///
    /// Absence is a normal outcome (`Ok(false)`), not an error.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Evaluate a script on the current page and return its JSON result.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Discard the session and bring up a fresh one.
    async fn restart(&mut self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`Browser`] fake shared by discovery and sync tests.

    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::app::{FomoError, Result};
    use crate::scraper::Browser;

    pub(crate) struct FakePage {
        pub container: bool,
        pub body: Value,
    }

    /// Dispatches on recognizable fragments of the scripts the real layer
    /// evaluates: scroll commands, height reads, link collection, and the
    /// token page collection script.
    pub(crate) struct FakeBrowser {
        pub current_url: String,
        pub listing_heights: Vec<i64>,
        height_idx: usize,
        pub listing_links: Vec<String>,
        pub pages: HashMap<String, FakePage>,
        pub goto_log: Vec<String>,
        pub wait_log: Vec<String>,
        pub scroll_count: usize,
        pub restarts: usize,
        /// URLs whose navigation raises a session-level error.
        pub session_failures: HashSet<String>,
    }

    impl FakeBrowser {
        pub fn new() -> Self {
            Self {
                current_url: String::new(),
                listing_heights: vec![0],
                height_idx: 0,
                listing_links: Vec::new(),
                pages: HashMap::new(),
                goto_log: Vec::new(),
                wait_log: Vec::new(),
                scroll_count: 0,
                restarts: 0,
                session_failures: HashSet::new(),
            }
        }

        pub fn add_page(&mut self, url: &str, container: bool, body: Value) {
            self.pages.insert(url.to_string(), FakePage { container, body });
        }

        pub fn attempts_for(&self, url: &str) -> usize {
            self.goto_log.iter().filter(|u| u.as_str() == url).count()
        }
    }

    #[async_trait]
    impl Browser for FakeBrowser {
        async fn goto(&mut self, url: &str) -> Result<()> {
            if self.session_failures.contains(url) {
                return Err(FomoError::Session(format!("lost session at {}", url)));
            }
            self.goto_log.push(url.to_string());
            self.current_url = url.to_string();
            Ok(())
        }

        async fn wait_for(&mut self, _selector: &str, _timeout: Duration) -> Result<bool> {
            self.wait_log.push(self.current_url.clone());
            Ok(self
                .pages
                .get(&self.current_url)
                .map(|p| p.container)
                .unwrap_or(false))
        }

        async fn evaluate(&mut self, script: &str) -> Result<Value> {
            if script.contains("scrollTo") {
                self.scroll_count += 1;
                return Ok(Value::Null);
            }
            if script.contains("scrollHeight") {
                let height = self
                    .listing_heights
                    .get(self.height_idx)
                    .or(self.listing_heights.last())
                    .copied()
                    .unwrap_or(0);
                self.height_idx += 1;
                return Ok(json!(height));
            }
            if script.contains("a[href") {
                return Ok(json!(self.listing_links));
            }
            if script.contains("name_label") {
                return Ok(self
                    .pages
                    .get(&self.current_url)
                    .map(|p| p.body.clone())
                    .unwrap_or(Value::Null));
            }
            Ok(Value::Null)
        }

        async fn restart(&mut self) -> Result<()> {
            self.restarts += 1;
            Ok(())
        }
    }
}
