use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::app::{FomoError, Result};
use crate::scraper::{Browser, ScraperConfig};

/// Headless-Chrome session via chromiumoxide.
///
/// A single page is reused for every navigation; the whole browser is
/// discarded and relaunched on [`Browser::restart`].
pub struct ChromeBrowser {
    browser: CdpBrowser,
    page: Page,
    handler_task: JoinHandle<()>,
    config: ScraperConfig,
}

impl ChromeBrowser {
    pub async fn new(config: ScraperConfig) -> Result<Self> {
        let (browser, page, handler_task) = Self::launch(&config).await?;
        Ok(Self {
            browser,
            page,
            handler_task,
            config,
        })
    }

    async fn launch(config: &ScraperConfig) -> Result<(CdpBrowser, Page, JoinHandle<()>)> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--window-size=1920,1080");

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| FomoError::Session(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = CdpBrowser::launch(browser_config).await.map_err(|e| {
            FomoError::Session(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FomoError::Session(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| FomoError::Session(format!("Failed to set user agent: {}", e)))?;
        }

        Ok((browser, page, handler_task))
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| FomoError::Session(format!("Navigation to {} failed: {}", url, e)))?;

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| FomoError::Session(format!("Navigation to {} failed: {}", url, e)))?;

        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        // Poll with querySelector rather than CDP node search so that
        // absence is an ordinary false, never a protocol error.
        let quoted = serde_json::to_string(selector)
            .map_err(|e| FomoError::Scrape(format!("Bad selector {:?}: {}", selector, e)))?;
        let script = format!("document.querySelector({}) !== null", quoted);

        let deadline = Instant::now() + timeout;
        loop {
            let present = self
                .evaluate(&script)
                .await?
                .as_bool()
                .unwrap_or(false);
            if present {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| FomoError::Scrape(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| FomoError::Scrape(format!("Failed to parse script result: {:?}", e)))
    }

    async fn restart(&mut self) -> Result<()> {
        tracing::info!("Restarting browser session");

        self.handler_task.abort();
        let _ = self.browser.close().await;

        let (browser, page, handler_task) = Self::launch(&self.config).await?;
        self.browser = browser;
        self.page = page;
        self.handler_task = handler_task;
        Ok(())
    }
}

impl Drop for ChromeBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
