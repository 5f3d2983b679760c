//! Page retrieval: plain HTTP or a headless browser, chosen per source.

pub mod batch;
pub mod browser;
pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use data_model_jpt::models::Source;

use crate::Error;

pub use browser::{BrowserFetchConfig, ChromeFetcher};
pub use http::{HttpFetchConfig, HttpFetcher};

use batch::process_in_batches;

/// Sent with every request, by both backends.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Retrieves a page's HTML over plain HTTP.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, Error>;
}

/// Retrieves a page's rendered DOM from a browser.
#[async_trait]
pub trait BrowserFetcher: Send + Sync {
    /// False when the backend can't run on this machine (e.g. no browser installed).
    fn is_available(&self) -> bool;

    async fn render_page(&self, url: &str) -> Result<String, Error>;
}

/// One page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub requires_browser: bool,
}

impl From<&Source> for FetchTarget {
    fn from(source: &Source) -> Self {
        Self {
            url: source.url.clone(),
            requires_browser: source.requires_browser,
        }
    }
}

/// Chooses the backend per page and falls back to HTTP when the browser fails.
pub struct FetchRouter {
    http: Arc<dyn PageFetcher>,
    browser: Option<Arc<dyn BrowserFetcher>>,
    fallback: bool,
    concurrency: usize,
}

impl FetchRouter {
    pub fn new(http: Arc<dyn PageFetcher>) -> Self {
        Self {
            http,
            browser: None,
            fallback: true,
            concurrency: 1,
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserFetcher>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Whether a failed or unavailable browser fetch is retried over HTTP. On by default.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Maximum number of pages fetched at once by [`FetchRouter::fetch_multiple`].
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The page's HTML, or `None` when every applicable backend failed.
    pub async fn fetch(&self, url: &str, requires_browser: bool) -> Option<String> {
        if requires_browser {
            match &self.browser {
                Some(browser) if browser.is_available() => match browser.render_page(url).await {
                    Ok(html) => return Some(html),
                    Err(e) if self.fallback => {
                        tracing::warn!("Browser fetch failed for {} ({}), falling back to HTTP", url, e);
                    }
                    Err(e) => {
                        tracing::warn!("Browser fetch failed for {} and fallback is disabled: {}", url, e);
                        return None;
                    }
                },
                _ if self.fallback => {
                    tracing::warn!("No browser backend available for {}, using HTTP", url);
                }
                _ => {
                    tracing::warn!("No browser backend available for {} and fallback is disabled", url);
                    return None;
                }
            }
        }

        match self.http.fetch_page(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!("HTTP fetch failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Fetches every target independently. Failures are recorded as `None` under the target's URL.
    pub async fn fetch_multiple(&self, targets: &[FetchTarget]) -> HashMap<String, Option<String>> {
        let fetched = process_in_batches(
            targets.to_vec(),
            |target, _index| async move {
                let html = self.fetch(&target.url, target.requires_browser).await;
                Some((target.url, html))
            },
            self.concurrency,
        )
        .await;

        let succeeded = fetched.iter().filter(|(_, html)| html.is_some()).count();
        tracing::info!("Fetched {}/{} sources", succeeded, targets.len());
        fetched.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed body (or fails) and counts calls.
    struct StubFetcher {
        body: Option<String>,
        available: bool,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body.to_string()),
                available: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                available: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                available: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn respond(&self) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body
                .clone()
                .ok_or_else(|| Error::BrowserError("stub failure".to_string()))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch_page(&self, _url: &str) -> Result<String, Error> {
            self.respond()
        }
    }

    #[async_trait]
    impl BrowserFetcher for StubFetcher {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn render_page(&self, _url: &str) -> Result<String, Error> {
            self.respond()
        }
    }

    /// Routes by URL: only URLs containing "good" succeed.
    struct UrlStub;

    #[async_trait]
    impl PageFetcher for UrlStub {
        async fn fetch_page(&self, url: &str) -> Result<String, Error> {
            if url.contains("good") {
                Ok(format!("<html>{}</html>", url))
            } else if url.contains("empty") {
                Ok(String::new())
            } else {
                Err(Error::HttpStatus(404))
            }
        }
    }

    #[tokio::test]
    async fn test_browser_result_used_when_it_succeeds() {
        let http = StubFetcher::ok("<html>static</html>");
        let browser = StubFetcher::ok("<html>rendered</html>");
        let router = FetchRouter::new(http.clone()).with_browser(browser.clone());

        let html = router.fetch("https://a.example/careers", true).await;
        assert_eq!(html.as_deref(), Some("<html>rendered</html>"));
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test]
    async fn test_browser_failure_falls_back_to_http_result() {
        let http = StubFetcher::ok("<html>static</html>");
        let browser = StubFetcher::failing();
        let router = FetchRouter::new(http.clone()).with_browser(browser.clone());

        let routed = router.fetch("https://a.example/careers", true).await;
        let direct = http.fetch_page("https://a.example/careers").await.ok();
        assert_eq!(routed, direct);
        assert_eq!(browser.calls(), 1);
    }

    #[tokio::test]
    async fn test_browser_failure_without_fallback_is_none() {
        let http = StubFetcher::ok("<html>static</html>");
        let router = FetchRouter::new(http.clone())
            .with_browser(StubFetcher::failing())
            .with_fallback(false);

        assert_eq!(router.fetch("https://a.example/careers", true).await, None);
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_browser_uses_http() {
        let http = StubFetcher::ok("<html>static</html>");
        let browser = StubFetcher::unavailable();
        let router = FetchRouter::new(http.clone()).with_browser(browser.clone());

        let html = router.fetch("https://a.example/careers", true).await;
        assert_eq!(html.as_deref(), Some("<html>static</html>"));
        assert_eq!(browser.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_browser_without_fallback_is_none() {
        let router = FetchRouter::new(StubFetcher::ok("<html>static</html>")).with_fallback(false);
        assert_eq!(router.fetch("https://a.example/careers", true).await, None);
    }

    #[tokio::test]
    async fn test_static_sources_never_touch_the_browser() {
        let http = StubFetcher::ok("<html>static</html>");
        let browser = StubFetcher::ok("<html>rendered</html>");
        let router = FetchRouter::new(http.clone()).with_browser(browser.clone());

        let html = router.fetch("https://a.example/careers", false).await;
        assert_eq!(html.as_deref(), Some("<html>static</html>"));
        assert_eq!(browser.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_multiple_isolates_failures() {
        let router = FetchRouter::new(Arc::new(UrlStub)).with_concurrency(2);
        let targets = vec![
            FetchTarget {
                url: "https://good.example/jobs".to_string(),
                requires_browser: false,
            },
            FetchTarget {
                url: "https://bad.example/jobs".to_string(),
                requires_browser: false,
            },
            FetchTarget {
                url: "https://empty.example/jobs".to_string(),
                requires_browser: false,
            },
        ];

        let results = router.fetch_multiple(&targets).await;
        assert_eq!(results.len(), 3);
        assert_eq!(
            results["https://good.example/jobs"].as_deref(),
            Some("<html>https://good.example/jobs</html>")
        );
        assert_eq!(results["https://bad.example/jobs"], None);
        // An empty page is a success, distinct from a failed fetch.
        assert_eq!(results["https://empty.example/jobs"].as_deref(), Some(""));
    }
}
