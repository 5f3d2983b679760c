use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::Error;
use crate::fetch::{PageFetcher, USER_AGENT};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.5";

#[derive(Debug, Clone)]
pub struct HttpFetchConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total attempts per URL.
    pub max_retries: u32,
    /// Base backoff delay (attempt `n` waits `delay * 2^n`) and the pause after each success.
    pub delay: Duration,
}

impl Default for HttpFetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Plain GET fetches with browser-like headers, retried with exponential backoff.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: HttpFetchConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpFetchConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    async fn get_once(&self, url: &url::Url) -> Result<String, Error> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// Backoff before retrying after failed attempt number `attempt` (0-based).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, Error> {
        let parsed = url::Url::parse(url)?;
        let attempts = self.config.max_retries.max(1);

        let mut attempt = 0;
        loop {
            match self.get_once(&parsed).await {
                Ok(html) => {
                    tracing::debug!("Fetched {} bytes from {}", html.len(), url);
                    tokio::time::sleep(self.config.delay).await;
                    return Ok(html);
                }
                Err(e) => {
                    tracing::warn!("Attempt {}/{} failed for {}: {}", attempt + 1, attempts, url, e);
                    if attempt + 1 >= attempts {
                        tracing::error!("Giving up on {} after {} attempts", url, attempts);
                        return Err(e);
                    }
                    tokio::time::sleep(backoff_delay(self.config.delay, attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
