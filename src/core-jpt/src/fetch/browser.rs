use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;

use crate::Error;
use crate::fetch::{BrowserFetcher, USER_AGENT};

/// Scrolls to the bottom so lazily loaded listings render.
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

#[derive(Debug, Clone)]
pub struct BrowserFetchConfig {
    pub page_load_timeout: Duration,
    /// Wait after navigation for client-side rendering.
    pub settle_delay: Duration,
    /// Wait after scrolling for lazy-loaded content.
    pub scroll_delay: Duration,
}

impl Default for BrowserFetchConfig {
    fn default() -> Self {
        Self {
            page_load_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(5),
            scroll_delay: Duration::from_secs(2),
        }
    }
}

impl BrowserFetchConfig {
    /// Upper bound for one whole render, navigation included.
    pub fn total_budget(&self) -> Duration {
        self.page_load_timeout + self.settle_delay + self.scroll_delay
    }
}

/// Renders pages in headless Chrome. Every fetch launches and tears down its own browser.
pub struct ChromeFetcher {
    config: BrowserFetchConfig,
}

impl ChromeFetcher {
    pub fn new(config: BrowserFetchConfig) -> Self {
        Self { config }
    }

    /// Fails when no Chrome/Chromium executable can be found.
    fn browser_config(&self) -> Result<BrowserConfig, Error> {
        BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", USER_AGENT))
            .window_size(1920, 1080)
            .request_timeout(self.config.page_load_timeout)
            .build()
            .map_err(Error::BrowserError)
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<String, Error> {
        let page = browser.new_page(url).await?;
        page.wait_for_navigation().await?;
        tokio::time::sleep(self.config.settle_delay).await;

        page.evaluate(SCROLL_TO_BOTTOM).await?;
        tokio::time::sleep(self.config.scroll_delay).await;

        let html = page.content().await?;
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {} (non-fatal)", url, e);
        }
        Ok(html)
    }
}

#[async_trait]
impl BrowserFetcher for ChromeFetcher {
    fn is_available(&self) -> bool {
        self.browser_config().is_ok()
    }

    async fn render_page(&self, url: &str) -> Result<String, Error> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let budget = self.config.total_budget();
        let result = match tokio::time::timeout(budget, self.render(&browser, url)).await {
            Ok(rendered) => rendered,
            Err(_) => Err(Error::Timeout(budget)),
        };

        if let Err(e) = browser.close().await {
            tracing::debug!("Failed to close browser after {}: {} (non-fatal)", url, e);
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process did not exit cleanly: {}", e);
        }
        handler_task.abort();

        match &result {
            Ok(html) => tracing::debug!("Rendered {} bytes from {}", html.len(), url),
            Err(e) => tracing::warn!("Browser fetch failed for {}: {}", url, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_covers_every_wait() {
        let config = BrowserFetchConfig::default();
        assert_eq!(config.total_budget(), Duration::from_secs(37));
    }
}
